pub mod config;
pub mod download;
pub mod results;
pub mod run;
pub mod status;
pub mod tasks;

pub use config::run as config;
pub use download::run as download;
pub use results::run as results;
pub use run::run;
pub use status::run as status;
pub use tasks::run as tasks;
