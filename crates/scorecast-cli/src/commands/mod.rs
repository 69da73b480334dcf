// One module per subcommand. Each exposes its clap `Args` and an `execute`
// entry point taking the shared `App`.

pub mod flow;
pub mod games;
pub mod odds;
pub mod prefs;
pub mod timeline;
pub mod watch;
