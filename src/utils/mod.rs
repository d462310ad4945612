pub mod ids;
pub mod logging;
pub mod url;
