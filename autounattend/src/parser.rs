//! Document parser: answer file XML in, configuration record out.
//!
//! This is a partial, lossy inverse of the builder. It recovers only the
//! fields the builder writes in recognizable form, and several fields are
//! heuristic reconstructions (partition layout from the creation-entry
//! count, tweaks from substrings of command lines). Treat the result as
//! recovered, not authoritative: `parse(build(c))` is not an identity.

use tracing::debug;

use crate::config::{
    Account, ComputerNameMode, PartitionStyle, PrivacySetting, ProductKeyMode, RecoveryMode,
    ScriptKind, ThemeMode, ToggleState, UnattendConfig,
};
use crate::error::UnattendError;
use crate::xml::Element;

/// Registry value names that identify a tweak command, in detection order.
/// Substring matching is best effort by design.
const TWEAK_MARKERS: &[(&str, fn(&mut UnattendConfig))] = &[
    ("DisableAntiSpyware", |c| c.disable_defender = true),
    ("NoAutoUpdate", |c| c.disable_updates = true),
    ("EnableLUA", |c| c.disable_uac = true),
    ("SmartScreenEnabled", |c| c.disable_smart_screen = true),
    ("AllowTelemetry", |c| c.disable_telemetry = true),
    ("LongPathsEnabled", |c| c.enable_long_paths = true),
    ("fDenyTSConnections", |c| c.enable_remote_desktop = true),
    ("/v Hidden", |c| c.explorer_show_hidden = true),
    ("HideFileExt", |c| c.explorer_show_extensions = true),
    ("{86ca1aa0-34aa-4e8b-a509-50c905bae2a2}", |c| {
        c.explorer_classic_context_menu = true
    }),
    ("LaunchTo", |c| c.explorer_this_pc_view = true),
    ("MouseSpeed", |c| c.disable_mouse_acceleration = true),
    ("TaskbarAl", |c| c.taskbar_align_left = true),
    ("BingSearchEnabled", |c| c.taskbar_disable_bing_search = true),
    ("Set-ExecutionPolicy", |c| {
        c.set_power_shell_execution_policy = true
    }),
    ("HideFirstRunExperience", |c| c.disable_edge_first_run = true),
];

/// Recover a configuration record from answer file text.
///
/// Fails only when the text is not well-formed XML; schema validity is not
/// checked and unrecognized content is skipped.
pub fn parse(xml: &str) -> Result<UnattendConfig, UnattendError> {
    let root: Element = xml.parse()?;

    let mut config = UnattendConfig::default();
    // Tweaks default on in the record would shadow what the document says.
    config.explorer_show_extensions = false;
    config.explorer_this_pc_view = false;

    parse_windows_pe(&root, &mut config);
    parse_specialize(&root, &mut config);
    parse_oobe_system(&root, &mut config);

    debug!(accounts = config.accounts.len(), "recovered configuration from answer file");
    Ok(config)
}

fn pass<'a>(root: &'a Element, name: &str) -> Option<&'a Element> {
    root.children_named("settings")
        .find(|settings| settings.attr_value("pass") == Some(name))
}

fn component<'a>(settings: &'a Element, name: &str) -> Option<&'a Element> {
    settings
        .children_named("component")
        .find(|component| component.attr_value("name") == Some(name))
}

fn parse_windows_pe(root: &Element, config: &mut UnattendConfig) {
    let Some(windows_pe) = pass(root, "windowsPE") else {
        return;
    };

    if let Some(intl) = component(windows_pe, "Microsoft-Windows-International-Core-WinPE") {
        if let Some(language) = intl.child_text("UILanguage") {
            config.language = language.to_string();
        }
        if let Some(keyboard) = intl.child_text("InputLocale") {
            config.keyboard = keyboard.to_string();
        }
    }

    if let Some(setup) = component(windows_pe, "Microsoft-Windows-Setup") {
        parse_disk(setup, config);

        if let Some(metadata) = setup
            .descendant("InstallFrom")
            .and_then(|from| from.child_named("MetaData"))
        {
            let key = metadata.child_text("Key");
            if key == Some("/IMAGE/NAME") || key == Some("/IMAGE/INDEX") {
                if let Some(value) = metadata.child_text("Value") {
                    config.windows_edition = value.to_string();
                }
            }
        }

        if let Some(key) = setup
            .descendant("ProductKey")
            .and_then(|product_key| product_key.child_text("Key"))
        {
            if !key.is_empty() {
                config.product_key_mode = ProductKeyMode::Custom;
                config.product_key = key.to_string();
            }
        }

        if let Some(run_synchronous) = setup.descendant("RunSynchronous") {
            for command in run_synchronous.descendants("Path") {
                let Some(path) = command.text.as_deref() else {
                    continue;
                };
                if path.contains("BypassTPMCheck") {
                    config.bypass_tpm = true;
                }
                if path.contains("BypassSecureBootCheck") {
                    config.bypass_secure_boot = true;
                }
                if path.contains("BypassRAMCheck") {
                    config.bypass_ram = true;
                }
                if path.contains("BypassStorageCheck") {
                    config.bypass_storage = true;
                }
            }
        }
    }

    // Architecture set, recovered from the component tags.
    let mut x86 = false;
    let mut amd64 = false;
    let mut arm64 = false;
    for component in windows_pe.children_named("component") {
        match component.attr_value("processorArchitecture") {
            Some("x86") => x86 = true,
            Some("amd64") => amd64 = true,
            Some("arm64") => arm64 = true,
            _ => {}
        }
    }
    if x86 || amd64 || arm64 {
        config.arch_x86 = x86;
        config.arch_amd64 = amd64;
        config.arch_arm64 = arm64;
    }
}

fn parse_disk(setup: &Element, config: &mut UnattendConfig) {
    let Some(disk) = setup
        .descendant("DiskConfiguration")
        .and_then(|disk_config| disk_config.child_named("Disk"))
    else {
        return;
    };

    if let Some(wipe) = disk.child_text("WillWipeDisk") {
        config.wipe_disk = wipe == "true";
    }

    // Partition layout is inferred from the count of creation entries.
    let partitions = disk.descendants("CreatePartition");
    match partitions.len() {
        4 => {
            config.partition_style = PartitionStyle::Gpt;
            config.recovery_mode = RecoveryMode::Partition;
        }
        3 => {
            config.partition_style = PartitionStyle::Gpt;
            config.recovery_mode = RecoveryMode::None;
        }
        2 => {
            config.partition_style = PartitionStyle::Mbr;
            config.recovery_mode = RecoveryMode::None;
        }
        _ => {}
    }

    // The recovery partition is taken to be the first one declaring a size
    // above 500 MB.
    for partition in partitions {
        if let Some(size) = partition
            .child_text("Size")
            .and_then(|size| size.parse::<u32>().ok())
        {
            if size > 500 {
                config.recovery_size = size;
                break;
            }
        }
    }
}

fn parse_specialize(root: &Element, config: &mut UnattendConfig) {
    let Some(specialize) = pass(root, "specialize") else {
        return;
    };

    if let Some(shell) = component(specialize, "Microsoft-Windows-Shell-Setup") {
        if let Some(name) = shell.child_text("ComputerName") {
            if name == "*" {
                config.computer_name_mode = ComputerNameMode::Random;
            } else {
                config.computer_name_mode = ComputerNameMode::Custom;
                config.computer_name = name.to_string();
            }
        }
        if let Some(timezone) = shell.child_text("TimeZone") {
            config.timezone = timezone.to_string();
        }
    }

    if let Some(defender) = component(specialize, "Windows-Defender-ApplicationGuard") {
        if defender.child_text("DisableAntiSpyware") == Some("true") {
            config.disable_defender = true;
        }
    }
}

fn parse_oobe_system(root: &Element, config: &mut UnattendConfig) {
    let Some(shell) = pass(root, "oobeSystem")
        .and_then(|oobe_system| component(oobe_system, "Microsoft-Windows-Shell-Setup"))
    else {
        return;
    };

    if let Some(oobe) = shell.child_named("OOBE") {
        config.skip_machine_oobe = oobe.child_text("SkipMachineOOBE") == Some("true");
        config.skip_user_oobe = oobe.child_text("SkipUserOOBE") == Some("true");
        match oobe.child_text("ProtectYourPC") {
            Some("3") => config.privacy_settings = PrivacySetting::Disable,
            Some("1") => config.privacy_settings = PrivacySetting::Enable,
            _ => {}
        }
    }

    parse_accounts(shell, config);
    parse_first_logon_commands(shell, config);
}

fn parse_accounts(shell: &Element, config: &mut UnattendConfig) {
    if let Some(local_accounts) = shell
        .child_named("UserAccounts")
        .and_then(|user_accounts| user_accounts.child_named("LocalAccounts"))
    {
        let mut accounts = Vec::new();
        for entry in local_accounts.children_named("LocalAccount") {
            let Some(name) = entry.child_text("Name") else {
                continue;
            };
            let mut account = Account::new(name);
            if let Some(display_name) = entry.child_text("DisplayName") {
                account.display_name = display_name.to_string();
            }
            if let Some(group) = entry.child_text("Group") {
                account.group = group.to_string();
            }
            // Stored form; a non-empty value may be the encoded password.
            if let Some(password) = entry
                .child_named("Password")
                .and_then(|password| password.child_text("Value"))
            {
                account.password = password.to_string();
            }
            accounts.push(account);
        }
        if !accounts.is_empty() {
            config.accounts = accounts;
        }
    }

    if let Some(admin) = shell
        .child_named("UserAccounts")
        .and_then(|user_accounts| user_accounts.child_named("AdministratorPassword"))
    {
        config.enable_builtin_admin = true;
        if let Some(value) = admin.child_text("Value") {
            config.builtin_admin_password = value.to_string();
        }
    }

    if let Some(auto_logon) = shell.child_named("AutoLogon") {
        if auto_logon.child_text("Enabled") == Some("true") {
            if let Some(username) = auto_logon.child_text("Username") {
                for account in config.accounts.iter_mut() {
                    if account.username == username {
                        account.autologon = true;
                        break;
                    }
                }
            }
        }
    }
}

fn parse_first_logon_commands(shell: &Element, config: &mut UnattendConfig) {
    let Some(first_logon) = shell.child_named("FirstLogonCommands") else {
        return;
    };

    for command in first_logon.children_named("SynchronousCommand") {
        let Some(line) = command.child_text("CommandLine") else {
            continue;
        };

        let mut recognized = false;
        for (marker, apply) in TWEAK_MARKERS {
            if line.contains(marker) {
                apply(config);
                recognized = true;
            }
        }
        if line.contains("AppsUseLightTheme") {
            config.theme_mode = if line.contains("/d 0") {
                ThemeMode::Dark
            } else {
                ThemeMode::Light
            };
            recognized = true;
        }
        if line.contains("InitialKeyboardIndicators") {
            config.num_lock_state = if line.contains("\"2\"") {
                ToggleState::On
            } else {
                ToggleState::Off
            };
            recognized = true;
        }
        if line.contains("VBoxWindowsAdditions") {
            config.vm_virtual_box = true;
            recognized = true;
        }
        if line.contains("/qn REBOOT=R") {
            config.vm_vmware = true;
            recognized = true;
        }
        if line.contains("FirstLogon.") {
            recognized = true;
            if let Some(kind) = script_kind_from_line(line) {
                config.first_logon_script_type = kind;
            }
        }

        // Anything else that launches a shell is captured verbatim; when
        // several exist the last one wins.
        if !recognized
            && (line.contains("powershell") || line.contains("cmd"))
            && !line.contains("reg add")
        {
            config.custom_script = Some(line.to_string());
        }
    }
}

fn script_kind_from_line(line: &str) -> Option<ScriptKind> {
    for kind in [
        ScriptKind::Ps1,
        ScriptKind::Cmd,
        ScriptKind::Reg,
        ScriptKind::Vbs,
        ScriptKind::Js,
    ] {
        if line.contains(&format!("FirstLogon.{}", kind.extension())) {
            return Some(kind);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder;
    use crate::config::PartitionMode;

    fn base_config() -> UnattendConfig {
        let mut config = UnattendConfig::default();
        config.explorer_show_extensions = false;
        config.explorer_this_pc_view = false;
        config.accounts = vec![Account::new("alice")];
        config
    }

    #[test]
    fn test_malformed_document_is_fatal() {
        let result = parse("<unattend><settings></unattend>");
        assert!(matches!(result, Err(UnattendError::MalformedDocument(_))));

        assert!(parse("").is_err());
        assert!(parse("plain text").is_err());
    }

    #[test]
    fn test_recovers_exact_match_fields() {
        let mut config = base_config();
        config.timezone = String::from("W. Europe Standard Time");
        config.language = String::from("de-DE");
        config.keyboard = String::from("0407:00000407");
        config.computer_name_mode = ComputerNameMode::Custom;
        config.computer_name = String::from("WORKSTATION-7");
        config.product_key_mode = ProductKeyMode::Custom;
        config.product_key = String::from("VK7JG-NPHTM-C97JM-9MPGT-3V66T");

        let recovered = parse(&builder::build(&config).unwrap()).unwrap();
        assert_eq!(recovered.timezone, "W. Europe Standard Time");
        assert_eq!(recovered.language, "de-DE");
        assert_eq!(recovered.keyboard, "0407:00000407");
        assert_eq!(recovered.computer_name_mode, ComputerNameMode::Custom);
        assert_eq!(recovered.computer_name, "WORKSTATION-7");
        assert_eq!(recovered.product_key_mode, ProductKeyMode::Custom);
        assert_eq!(recovered.product_key, "VK7JG-NPHTM-C97JM-9MPGT-3V66T");
    }

    #[test]
    fn test_recovers_wildcard_computer_name_as_random_mode() {
        let recovered = parse(&builder::build(&base_config()).unwrap()).unwrap();
        assert_eq!(recovered.computer_name_mode, ComputerNameMode::Random);
        assert!(recovered.computer_name.is_empty());
    }

    #[test]
    fn test_recovers_architectures() {
        let mut config = base_config();
        config.arch_x86 = true;
        config.arch_arm64 = true;

        let recovered = parse(&builder::build(&config).unwrap()).unwrap();
        assert!(recovered.arch_x86);
        assert!(recovered.arch_amd64);
        assert!(recovered.arch_arm64);
    }

    #[test]
    fn test_partition_layout_heuristics() {
        let recovered = parse(&builder::build(&base_config()).unwrap()).unwrap();
        assert_eq!(recovered.partition_style, PartitionStyle::Gpt);
        assert_eq!(recovered.recovery_mode, RecoveryMode::Partition);
        assert_eq!(recovered.recovery_size, 990);

        let mut config = base_config();
        config.recovery_mode = RecoveryMode::None;
        let recovered = parse(&builder::build(&config).unwrap()).unwrap();
        assert_eq!(recovered.partition_style, PartitionStyle::Gpt);
        assert_eq!(recovered.recovery_mode, RecoveryMode::None);
    }

    #[test]
    fn test_recovery_size_is_first_size_above_500() {
        let mut config = base_config();
        config.recovery_size = 2048;
        let recovered = parse(&builder::build(&config).unwrap()).unwrap();
        assert_eq!(recovered.recovery_size, 2048);
    }

    #[test]
    fn test_recovers_bypass_flags() {
        let mut config = base_config();
        config.bypass_tpm = true;

        // The builder writes all four checks once any flag is set.
        let recovered = parse(&builder::build(&config).unwrap()).unwrap();
        assert!(recovered.bypass_tpm);
        assert!(recovered.bypass_secure_boot);
        assert!(recovered.bypass_ram);
        assert!(recovered.bypass_storage);
    }

    #[test]
    fn test_recovers_tweaks_by_substring() {
        let mut config = base_config();
        config.disable_telemetry = true;
        config.disable_defender = true;
        config.taskbar_align_left = true;
        config.theme_mode = ThemeMode::Dark;
        config.num_lock_state = ToggleState::On;

        let recovered = parse(&builder::build(&config).unwrap()).unwrap();
        assert!(recovered.disable_telemetry);
        assert!(recovered.disable_defender);
        assert!(recovered.taskbar_align_left);
        assert!(!recovered.disable_updates);
        assert_eq!(recovered.theme_mode, ThemeMode::Dark);
        assert_eq!(recovered.num_lock_state, ToggleState::On);
    }

    #[test]
    fn test_recovers_accounts_with_stored_passwords() {
        let mut config = base_config();
        let mut admin = Account::new("admin");
        admin.password = String::from("Pass1");
        admin.display_name = String::from("Administrator");
        admin.group = String::from("Administrators");
        admin.autologon = true;
        config.accounts = vec![Account::new("alice"), admin];

        let recovered = parse(&builder::build(&config).unwrap()).unwrap();
        assert_eq!(recovered.accounts.len(), 2);
        assert_eq!(recovered.accounts[0].username, "alice");
        assert_eq!(recovered.accounts[1].username, "admin");
        assert_eq!(recovered.accounts[1].display_name, "Administrator");
        assert_eq!(recovered.accounts[1].group, "Administrators");
        // Stored (encoded) form, not the clear text.
        assert_eq!(recovered.accounts[1].password, "UGFzczFQYXNzd29yZA==");
        assert!(recovered.accounts[1].autologon);
        assert!(!recovered.accounts[0].autologon);
    }

    #[test]
    fn test_recovers_vm_tool_flags_and_script_kind() {
        let mut config = base_config();
        config.vm_virtual_box = true;
        config.vm_vmware = true;
        config.first_logon_script_type = ScriptKind::Cmd;
        config.first_logon_script = String::from("echo hi");

        let recovered = parse(&builder::build(&config).unwrap()).unwrap();
        assert!(recovered.vm_virtual_box);
        assert!(recovered.vm_vmware);
        assert_eq!(recovered.first_logon_script_type, ScriptKind::Cmd);
    }

    #[test]
    fn test_unrecognized_shell_command_is_captured_last_wins() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<unattend xmlns="urn:schemas-microsoft-com:unattend">
    <settings pass="oobeSystem">
        <component name="Microsoft-Windows-Shell-Setup" processorArchitecture="amd64">
            <FirstLogonCommands>
                <SynchronousCommand>
                    <Order>1</Order>
                    <CommandLine>powershell -Command "Get-Date"</CommandLine>
                </SynchronousCommand>
                <SynchronousCommand>
                    <Order>2</Order>
                    <CommandLine>cmd /c echo later</CommandLine>
                </SynchronousCommand>
            </FirstLogonCommands>
        </component>
    </settings>
</unattend>"#;

        let recovered = parse(xml).unwrap();
        assert_eq!(recovered.custom_script.as_deref(), Some("cmd /c echo later"));
    }

    #[test]
    fn test_recognized_tweaks_are_not_captured_as_custom_script() {
        let mut config = base_config();
        config.set_power_shell_execution_policy = true;

        let recovered = parse(&builder::build(&config).unwrap()).unwrap();
        assert!(recovered.set_power_shell_execution_policy);
        assert!(recovered.custom_script.is_none());
    }

    #[test]
    fn test_custom_partition_stub_keeps_defaults() {
        let mut config = base_config();
        config.partition_mode = PartitionMode::Custom;

        let recovered = parse(&builder::build(&config).unwrap()).unwrap();
        // No creation entries to infer a layout from.
        assert_eq!(recovered.partition_style, PartitionStyle::Gpt);
        assert_eq!(recovered.recovery_size, 990);
    }
}
