//! The flat configuration record that the builder consumes and the parser
//! produces.
//!
//! Field names serialize to the same JSON keys the original web tool
//! exports, so existing `unattend-config.json` files import unchanged.
//! Every field has a default: a record missing keys (or carrying unknown
//! enum values) still deserializes, which keeps the core total over its
//! input domain.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

pub mod presets;

static COMPUTER_NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9-]{1,15}$").unwrap());
static USERNAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]{1,20}$").unwrap());
static PRODUCT_KEY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Z0-9]{5}-){4}[A-Z0-9]{5}$").unwrap());

/// A processor architecture tag carried by replicated components.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arch {
    X86,
    Amd64,
    Arm64,
}

impl Arch {
    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::X86 => "x86",
            Arch::Amd64 => "amd64",
            Arch::Arm64 => "arm64",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComputerNameMode {
    Custom,
    #[default]
    #[serde(other)]
    Random,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductKeyMode {
    Custom,
    Generic,
    #[default]
    #[serde(other)]
    None,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartitionMode {
    Custom,
    #[default]
    #[serde(other)]
    Auto,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartitionStyle {
    Mbr,
    #[default]
    #[serde(other)]
    Gpt,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecoveryMode {
    None,
    #[default]
    #[serde(other)]
    Partition,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    Dark,
    Light,
    #[default]
    #[serde(other)]
    Default,
}

/// Tri-state used for the keyboard toggle keys.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToggleState {
    On,
    Off,
    #[default]
    #[serde(other)]
    Default,
}

/// Tri-state driving the OOBE privacy question screen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrivacySetting {
    Enable,
    Disable,
    #[default]
    #[serde(other)]
    Interactive,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WifiMode {
    Configure,
    Skip,
    #[default]
    #[serde(other)]
    Interactive,
}

/// Kind of an injected script. The serialized token doubles as the file
/// extension the script is written under.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptKind {
    Ps1,
    Cmd,
    Reg,
    Vbs,
    Js,
    #[default]
    #[serde(rename = "", other)]
    None,
}

impl ScriptKind {
    pub fn extension(&self) -> &'static str {
        match self {
            ScriptKind::Ps1 => "ps1",
            ScriptKind::Cmd => "cmd",
            ScriptKind::Reg => "reg",
            ScriptKind::Vbs => "vbs",
            ScriptKind::Js => "js",
            ScriptKind::None => "",
        }
    }

    /// Command line that executes a script of this kind at the given path.
    pub fn launcher(&self, path: &str) -> String {
        match self {
            ScriptKind::Ps1 => format!("powershell -ExecutionPolicy Bypass -File \"{path}\""),
            ScriptKind::Cmd => format!("cmd /c \"{path}\""),
            ScriptKind::Reg => format!("reg import \"{path}\""),
            _ => format!("cscript //nologo \"{path}\""),
        }
    }
}

/// One local account entry.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Account {
    pub username: String,
    #[serde(rename = "displayname")]
    pub display_name: String,
    pub password: String,
    pub group: String,
    pub autologon: bool,
}

impl Default for Account {
    fn default() -> Self {
        Self {
            username: String::new(),
            display_name: String::new(),
            password: String::new(),
            group: String::from("Users"),
            autologon: false,
        }
    }
}

impl Account {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            ..Default::default()
        }
    }
}

/// The full option set. Held in memory only; created by JSON import or by
/// the parser, consumed immediately by the builder.
#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
#[validate(schema(function = "validate_unattend_config"))]
pub struct UnattendConfig {
    // Architecture
    #[serde(rename = "arch_x86")]
    pub arch_x86: bool,
    #[serde(rename = "arch_amd64")]
    pub arch_amd64: bool,
    #[serde(rename = "arch_arm64")]
    pub arch_arm64: bool,

    // Language & region
    pub language: String,
    pub language_secondary: String,
    pub language_tertiary: String,
    pub keyboard: String,
    pub geo_location: String,
    pub timezone: String,

    // Setup options
    #[serde(rename = "bypassTPM")]
    pub bypass_tpm: bool,
    pub bypass_secure_boot: bool,
    #[serde(rename = "bypassRAM")]
    pub bypass_ram: bool,
    pub bypass_storage: bool,
    pub show_power_shell: bool,
    pub disable_narrator: bool,
    #[serde(rename = "skipMachineOOBE")]
    pub skip_machine_oobe: bool,
    #[serde(rename = "skipUserOOBE")]
    pub skip_user_oobe: bool,

    // Windows edition
    pub windows_edition: String,
    pub product_key_mode: ProductKeyMode,
    pub product_key: String,

    // Computer name
    pub computer_name_mode: ComputerNameMode,
    pub computer_name: String,

    // User accounts
    pub enable_builtin_admin: bool,
    pub builtin_admin_password: String,
    #[validate(length(min = 1, max = 99))]
    pub accounts: Vec<Account>,

    // Password policy
    pub password_expiration: String,
    pub password_expiration_days: u32,
    pub enable_account_lockout: bool,
    pub lockout_threshold: u32,
    pub lockout_window: u32,
    pub lockout_duration: u32,

    // Disk configuration
    pub partition_mode: PartitionMode,
    pub partition_style: PartitionStyle,
    pub efi_size: u32,
    pub recovery_mode: RecoveryMode,
    pub recovery_size: u32,
    pub wipe_disk: bool,
    pub custom_disk_part: String,

    // System tweaks
    pub disable_defender: bool,
    pub disable_updates: bool,
    #[serde(rename = "disableUAC")]
    pub disable_uac: bool,
    pub disable_smart_screen: bool,
    pub enable_long_paths: bool,
    pub enable_remote_desktop: bool,
    pub disable_telemetry: bool,
    pub disable_edge_first_run: bool,
    pub disable_mouse_acceleration: bool,
    pub set_power_shell_execution_policy: bool,

    // Explorer & taskbar
    pub explorer_show_hidden: bool,
    pub explorer_show_extensions: bool,
    pub explorer_classic_context_menu: bool,
    #[serde(rename = "explorerThisPCView")]
    pub explorer_this_pc_view: bool,
    pub taskbar_align_left: bool,
    pub taskbar_disable_bing_search: bool,

    // Appearance
    pub theme_mode: ThemeMode,
    pub accent_color: String,
    pub enable_transparency: bool,

    // Accessibility
    pub caps_lock_state: ToggleState,
    pub num_lock_state: ToggleState,
    pub scroll_lock_state: ToggleState,

    // Privacy
    pub privacy_settings: PrivacySetting,

    // Network
    pub wifi_mode: WifiMode,
    #[serde(rename = "wifiSSID")]
    pub wifi_ssid: String,
    pub wifi_auth: String,
    pub wifi_password: String,
    pub wifi_hidden_network: bool,
    pub wifi_auto_connect: bool,

    // VM guest tools
    pub vm_virtual_box: bool,
    #[serde(rename = "vmVMware")]
    pub vm_vmware: bool,
    #[serde(rename = "vmVirtIO")]
    pub vm_virtio: bool,
    pub vm_parallels: bool,

    // Script injection slots. Only the first-logon slot is materialized in
    // the answer file; the others are carried for the surrounding tooling.
    pub system_script_type: ScriptKind,
    pub system_script: String,
    pub user_once_script_type: ScriptKind,
    pub user_once_script: String,
    pub first_logon_script_type: ScriptKind,
    pub first_logon_script: String,
    pub default_user_script_type: ScriptKind,
    pub default_user_script: String,

    /// Best-effort slot the parser fills with an unrecognized first-logon
    /// command line. Recovered, never authoritative.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_script: Option<String>,
}

impl Default for UnattendConfig {
    fn default() -> Self {
        Self {
            arch_x86: false,
            arch_amd64: true,
            arch_arm64: false,

            language: String::from("en-US"),
            language_secondary: String::new(),
            language_tertiary: String::new(),
            keyboard: String::from("0409:00000409"),
            geo_location: String::from("244"),
            timezone: String::from("Pacific Standard Time"),

            bypass_tpm: false,
            bypass_secure_boot: false,
            bypass_ram: false,
            bypass_storage: false,
            show_power_shell: false,
            disable_narrator: false,
            skip_machine_oobe: true,
            skip_user_oobe: true,

            windows_edition: String::from("Professional"),
            product_key_mode: ProductKeyMode::None,
            product_key: String::new(),

            computer_name_mode: ComputerNameMode::Random,
            computer_name: String::new(),

            enable_builtin_admin: false,
            builtin_admin_password: String::new(),
            accounts: vec![Account::default()],

            password_expiration: String::from("default"),
            password_expiration_days: 90,
            enable_account_lockout: false,
            lockout_threshold: 5,
            lockout_window: 30,
            lockout_duration: 30,

            partition_mode: PartitionMode::Auto,
            partition_style: PartitionStyle::Gpt,
            efi_size: 100,
            recovery_mode: RecoveryMode::Partition,
            recovery_size: 990,
            wipe_disk: true,
            custom_disk_part: String::new(),

            disable_defender: false,
            disable_updates: false,
            disable_uac: false,
            disable_smart_screen: false,
            enable_long_paths: false,
            enable_remote_desktop: false,
            disable_telemetry: false,
            disable_edge_first_run: false,
            disable_mouse_acceleration: false,
            set_power_shell_execution_policy: false,

            explorer_show_hidden: false,
            explorer_show_extensions: true,
            explorer_classic_context_menu: false,
            explorer_this_pc_view: true,
            taskbar_align_left: false,
            taskbar_disable_bing_search: false,

            theme_mode: ThemeMode::Default,
            accent_color: String::from("#0078d4"),
            enable_transparency: false,

            caps_lock_state: ToggleState::Default,
            num_lock_state: ToggleState::Default,
            scroll_lock_state: ToggleState::Default,

            privacy_settings: PrivacySetting::Interactive,

            wifi_mode: WifiMode::Interactive,
            wifi_ssid: String::new(),
            wifi_auth: String::from("wpa2psk"),
            wifi_password: String::new(),
            wifi_hidden_network: false,
            wifi_auto_connect: true,

            vm_virtual_box: false,
            vm_vmware: false,
            vm_virtio: false,
            vm_parallels: false,

            system_script_type: ScriptKind::None,
            system_script: String::new(),
            user_once_script_type: ScriptKind::None,
            user_once_script: String::new(),
            first_logon_script_type: ScriptKind::None,
            first_logon_script: String::new(),
            default_user_script_type: ScriptKind::None,
            default_user_script: String::new(),

            custom_script: None,
        }
    }
}

impl UnattendConfig {
    /// The selected architecture set, never empty.
    pub fn selected_architectures(&self) -> Vec<Arch> {
        let mut archs = Vec::new();
        if self.arch_x86 {
            archs.push(Arch::X86);
        }
        if self.arch_amd64 {
            archs.push(Arch::Amd64);
        }
        if self.arch_arm64 {
            archs.push(Arch::Arm64);
        }
        if archs.is_empty() {
            archs.push(Arch::Amd64);
        }
        archs
    }

    /// Accounts that will actually be created (non-empty username).
    pub fn populated_accounts(&self) -> Vec<&Account> {
        self.accounts
            .iter()
            .filter(|account| !account.username.is_empty())
            .collect()
    }
}

fn validate_unattend_config(config: &UnattendConfig) -> Result<(), ValidationError> {
    if config.computer_name_mode == ComputerNameMode::Custom
        && !COMPUTER_NAME_PATTERN.is_match(&config.computer_name)
    {
        return Err(ValidationError::new("computer_name"));
    }
    if config.product_key_mode == ProductKeyMode::Custom
        && !PRODUCT_KEY_PATTERN.is_match(&config.product_key)
    {
        return Err(ValidationError::new("product_key"));
    }
    for account in config.populated_accounts() {
        if !USERNAME_PATTERN.is_match(&account.username) {
            return Err(ValidationError::new("username"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_original_model() {
        let config = UnattendConfig::default();

        assert!(config.arch_amd64);
        assert!(!config.arch_x86);
        assert_eq!(config.language, "en-US");
        assert_eq!(config.timezone, "Pacific Standard Time");
        assert_eq!(config.efi_size, 100);
        assert_eq!(config.recovery_size, 990);
        assert_eq!(config.accounts.len(), 1);
        assert_eq!(config.accounts[0].group, "Users");
        assert!(config.explorer_show_extensions);
        assert_eq!(config.product_key_mode, ProductKeyMode::None);
    }

    #[test]
    fn test_json_keys_are_compatible_with_the_web_tool() {
        let json = serde_json::to_string(&UnattendConfig::default()).unwrap();

        assert!(json.contains("\"arch_amd64\""));
        assert!(json.contains("\"bypassTPM\""));
        assert!(json.contains("\"disableUAC\""));
        assert!(json.contains("\"skipMachineOOBE\""));
        assert!(json.contains("\"explorerThisPCView\""));
        assert!(json.contains("\"wifiSSID\""));
        assert!(json.contains("\"firstLogonScriptType\":\"\""));
    }

    #[test]
    fn test_partial_and_unknown_input_deserializes_to_defaults() {
        let config: UnattendConfig = serde_json::from_str(
            r#"{"timezone":"W. Europe Standard Time","mystery":1,"recoveryMode":"whatever",
                "computerNameMode":"surprise","partitionMode":"??","partitionStyle":"apm"}"#,
        )
        .unwrap();

        assert_eq!(config.timezone, "W. Europe Standard Time");
        assert_eq!(config.recovery_mode, RecoveryMode::Partition);
        assert_eq!(config.computer_name_mode, ComputerNameMode::Random);
        assert_eq!(config.partition_mode, PartitionMode::Auto);
        assert_eq!(config.partition_style, PartitionStyle::Gpt);
        assert!(config.arch_amd64);
    }

    #[test]
    fn test_selected_architectures_never_empty() {
        let mut config = UnattendConfig::default();
        config.arch_amd64 = false;
        assert_eq!(config.selected_architectures(), vec![Arch::Amd64]);

        config.arch_x86 = true;
        config.arch_arm64 = true;
        assert_eq!(config.selected_architectures(), vec![Arch::X86, Arch::Arm64]);
    }

    #[test]
    fn test_validation_rejects_bad_computer_name() {
        let mut config = UnattendConfig::default();
        config.computer_name_mode = ComputerNameMode::Custom;
        config.computer_name = String::from("way-too-long-computer-name");
        assert!(config.validate().is_err());

        config.computer_name = String::from("DESKTOP-01");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_product_key() {
        let mut config = UnattendConfig::default();
        config.product_key_mode = ProductKeyMode::Custom;
        config.product_key = String::from("not-a-key");
        assert!(config.validate().is_err());

        config.product_key = String::from("VK7JG-NPHTM-C97JM-9MPGT-3V66T");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_empty_account_list() {
        let mut config = UnattendConfig::default();
        config.accounts.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_script_kind_launchers() {
        assert_eq!(
            ScriptKind::Ps1.launcher(r"C:\s\a.ps1"),
            r#"powershell -ExecutionPolicy Bypass -File "C:\s\a.ps1""#
        );
        assert_eq!(ScriptKind::Cmd.launcher(r"C:\s\a.cmd"), r#"cmd /c "C:\s\a.cmd""#);
        assert_eq!(ScriptKind::Reg.launcher(r"C:\s\a.reg"), r#"reg import "C:\s\a.reg""#);
        assert_eq!(ScriptKind::Vbs.launcher(r"C:\s\a.vbs"), r#"cscript //nologo "C:\s\a.vbs""#);
    }
}
