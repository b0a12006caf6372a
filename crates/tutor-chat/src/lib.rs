pub mod console;
pub mod session;

pub use console::{Console, ScriptedConsole, StdConsole};
pub use session::{Session, Turn};
