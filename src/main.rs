use agentdesk::cli::AlreadyReported;

fn main() {
    if let Err(err) = agentdesk::cli::main() {
        if !err.is::<AlreadyReported>() {
            eprintln!("❌ {err}");
        }
        std::process::exit(1);
    }
}
