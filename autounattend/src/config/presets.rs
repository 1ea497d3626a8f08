//! Built-in starting configurations for common scenarios.

use super::{
    Account, ComputerNameMode, PrivacySetting, ScriptKind, ThemeMode, UnattendConfig,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Preset {
    /// Bare bones install with telemetry off
    Minimal,
    /// One administrator account with auto logon
    SingleUser,
    /// Tuned for a virtual machine guest
    VmGuest,
}

impl Preset {
    pub fn config(&self) -> UnattendConfig {
        match self {
            Preset::Minimal => minimal(),
            Preset::SingleUser => single_user(),
            Preset::VmGuest => vm_guest(),
        }
    }
}

fn minimal() -> UnattendConfig {
    UnattendConfig {
        accounts: vec![Account::new("User")],
        disable_telemetry: true,
        ..Default::default()
    }
}

fn single_user() -> UnattendConfig {
    let mut admin = Account::new("Admin");
    admin.password = String::from("Password123");
    admin.group = String::from("Administrators");
    admin.autologon = true;

    UnattendConfig {
        accounts: vec![admin],
        disable_telemetry: true,
        disable_uac: true,
        set_power_shell_execution_policy: true,
        privacy_settings: PrivacySetting::Disable,
        ..Default::default()
    }
}

fn vm_guest() -> UnattendConfig {
    let mut user = Account::new("VMUser");
    user.autologon = true;

    UnattendConfig {
        computer_name_mode: ComputerNameMode::Custom,
        computer_name: String::from("VM-GUEST"),
        accounts: vec![user],
        disable_telemetry: true,
        disable_defender: true,
        disable_uac: true,
        disable_updates: true,
        disable_mouse_acceleration: true,
        theme_mode: ThemeMode::Dark,
        first_logon_script_type: ScriptKind::Ps1,
        first_logon_script: String::from(
            "Set-Service -Name \"SysMain\" -StartupType Disabled\nStop-Service -Name \"SysMain\"",
        ),
        ..Default::default()
    }
}
