//! CLI command implementations

mod config;
mod device;
mod exec;
mod file;
mod forward;
mod hilog;

pub use config::{config_init, config_path, config_show};
pub use device::{list_command, monitor_command, select_device, wait_command, Selection};
pub use exec::{install_command, shell_command, uninstall_command, version_command};
pub use file::{recv_command, send_command};
pub use forward::{fport_command, fport_list_command, fport_remove_command, rport_command};
pub use hilog::{hilog_command, hilog_follow_command};
