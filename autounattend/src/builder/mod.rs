//! Document builder: configuration record in, answer file XML out.
//!
//! The document is assembled as an [`Element`] tree in three passes
//! (windowsPE, specialize, oobeSystem), then serialized once. Components
//! are built for the first selected architecture and replicated per
//! additional architecture by structural clone.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use tracing::{debug, warn};

use crate::config::{
    Arch, ComputerNameMode, PartitionMode, PartitionStyle, PrivacySetting, ProductKeyMode,
    RecoveryMode, ScriptKind, UnattendConfig,
};
use crate::error::UnattendError;
use crate::xml::Element;

pub mod tweaks;

const UNATTEND_XMLNS: &str = "urn:schemas-microsoft-com:unattend";
const WCM_XMLNS: &str = "http://schemas.microsoft.com/WMIConfig/2002/State";
const XSI_XMLNS: &str = "http://www.w3.org/2001/XMLSchema-instance";
const PUBLIC_KEY_TOKEN: &str = "31bf3856ad364e35";

/// Partition type GUID Windows expects on a recovery partition.
const RECOVERY_TYPE_ID: &str = "de94bba4-06d1-4d40-a16a-bfd50179d6ac";

const SCRIPT_DIR: &str = r"C:\Windows\Setup\Scripts";

/// Non-activating edition selection keys.
const GENERIC_KEYS: &[(&str, &str)] = &[
    ("Professional", "VK7JG-NPHTM-C97JM-9MPGT-3V66T"),
    ("Home", "TX9XD-98N7V-6WMQ6-BX7FG-H8Q99"),
    ("Education", "NW6C2-QMPVW-D7KKK-3GKT6-VCFB2"),
    ("Enterprise", "NPPR9-FWDCX-D2C8J-H872K-2YT43"),
];

/// Build the complete answer file for a configuration record.
///
/// Total and deterministic: missing fields fall back to defaults and no
/// ambient randomness is read. When no explicit computer name is set the
/// wildcard token is emitted; generating a concrete random name is the
/// caller's business.
pub fn build(config: &UnattendConfig) -> Result<String, UnattendError> {
    let architectures = config.selected_architectures();
    debug!(architectures = ?architectures, "building unattended answer file");

    let document = build_document(config, architectures[0]);
    if architectures.len() > 1 {
        let replicated = replicate_components(&document, &architectures);
        match replicated.to_xml() {
            Ok(xml) => return Ok(xml),
            // Recoverable: fall back to the single-architecture document.
            Err(err) => warn!(
                error = %err,
                "architecture replication failed to serialize, emitting single-architecture document"
            ),
        }
    }
    document.to_xml()
}

fn build_document(config: &UnattendConfig, arch: Arch) -> Element {
    let mut root = Element::new("unattend").attr("xmlns", UNATTEND_XMLNS);

    let passes = [
        ("windowsPE", windows_pe_components(config, arch)),
        ("specialize", specialize_components(config, arch)),
        ("oobeSystem", oobe_system_components(config, arch)),
    ];
    for (pass, components) in passes {
        if components.is_empty() {
            continue;
        }
        let mut settings = Element::new("settings").attr("pass", pass);
        settings.children = components;
        root.push(settings);
    }
    root
}

/// Clone every architecture-tagged component once per additional selected
/// architecture, keeping each clone adjacent to its original.
fn replicate_components(document: &Element, architectures: &[Arch]) -> Element {
    let mut result = document.clone();
    for settings in result.children.iter_mut() {
        let components = std::mem::take(&mut settings.children);
        let mut expanded = Vec::with_capacity(components.len() * architectures.len());
        for component in components {
            let tagged = component.attr_value("processorArchitecture").is_some();
            expanded.push(component);
            if tagged {
                for arch in &architectures[1..] {
                    let mut clone = expanded.last().cloned().unwrap_or_default();
                    clone.set_attr("processorArchitecture", arch.as_str());
                    expanded.push(clone);
                }
            }
        }
        settings.children = expanded;
    }
    result
}

fn component(name: &str, arch: Arch) -> Element {
    Element::new("component")
        .attr("name", name)
        .attr("processorArchitecture", arch.as_str())
        .attr("publicKeyToken", PUBLIC_KEY_TOKEN)
        .attr("language", "neutral")
        .attr("versionScope", "nonSxS")
}

fn action_add(element: Element) -> Element {
    element.attr("wcm:action", "add")
}

fn or_default<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() { fallback } else { value }
}

// ---------------------------------------------------------------------------
// windowsPE pass
// ---------------------------------------------------------------------------

fn windows_pe_components(config: &UnattendConfig, arch: Arch) -> Vec<Element> {
    vec![
        international_component(config, arch),
        setup_component(config, arch),
    ]
}

fn international_component(config: &UnattendConfig, arch: Arch) -> Element {
    let language = or_default(&config.language, "en-US");
    let keyboard = or_default(&config.keyboard, "0409:00000409");

    let mut intl = component("Microsoft-Windows-International-Core-WinPE", arch)
        .attr("xmlns:wcm", WCM_XMLNS)
        .child(Element::new("SetupUILanguage").child(Element::leaf("UILanguage", language)))
        .child(Element::leaf("InputLocale", keyboard))
        .child(Element::leaf("SystemLocale", language))
        .child(Element::leaf("UILanguage", language))
        .child(Element::leaf("UserLocale", language));

    if !config.language_secondary.is_empty() || !config.language_tertiary.is_empty() {
        intl.push(Element::leaf("UILanguageFallback", "en-US"));
    }
    intl
}

fn setup_component(config: &UnattendConfig, arch: Arch) -> Element {
    let mut setup = component("Microsoft-Windows-Setup", arch)
        .attr("xmlns:wcm", WCM_XMLNS)
        .attr("xmlns:xsi", XSI_XMLNS);

    if let Some(run_synchronous) = bypass_commands(config) {
        setup.push(run_synchronous);
    }

    match config.partition_mode {
        PartitionMode::Auto => {
            setup.push(disk_configuration(config));
            setup.push(image_install(config));
        }
        // Custom partitioning is scripted outside the answer file; emit
        // only a disk stub with an empty creation list.
        PartitionMode::Custom => {
            setup.push(
                Element::new("DiskConfiguration").child(
                    action_add(Element::new("Disk"))
                        .child(Element::leaf("DiskID", "0"))
                        .child(Element::new("CreatePartitions")),
                ),
            );
        }
    }

    setup.push(user_data(config));
    setup
}

/// The four hardware-check bypasses are written together: once any check is
/// disabled the installer is already running outside supported hardware.
fn bypass_commands(config: &UnattendConfig) -> Option<Element> {
    if !(config.bypass_tpm || config.bypass_secure_boot || config.bypass_ram || config.bypass_storage)
    {
        return None;
    }

    let checks = [
        "BypassTPMCheck",
        "BypassSecureBootCheck",
        "BypassRAMCheck",
        "BypassStorageCheck",
    ];
    let mut run_synchronous = Element::new("RunSynchronous");
    for (index, check) in checks.iter().enumerate() {
        run_synchronous.push(
            action_add(Element::new("RunSynchronousCommand"))
                .child(Element::leaf("Order", (index + 1).to_string()))
                .child(Element::leaf(
                    "Path",
                    format!(r#"reg add "HKLM\SYSTEM\Setup\LabConfig" /v {check} /t REG_DWORD /d 1 /f"#),
                )),
        );
    }
    Some(run_synchronous)
}

fn disk_configuration(config: &UnattendConfig) -> Element {
    let mut create = Element::new("CreatePartitions");
    let mut modify = Element::new("ModifyPartitions");

    match config.partition_style {
        PartitionStyle::Gpt => {
            let efi_size = if config.efi_size == 0 { 100 } else { config.efi_size };
            let recovery_size = if config.recovery_size == 0 { 990 } else { config.recovery_size };
            let with_recovery = config.recovery_mode == RecoveryMode::Partition;

            create.push(
                action_add(Element::new("CreatePartition"))
                    .child(Element::leaf("Order", "1"))
                    .child(Element::leaf("Type", "EFI"))
                    .child(Element::leaf("Size", efi_size.to_string())),
            );
            create.push(
                action_add(Element::new("CreatePartition"))
                    .child(Element::leaf("Order", "2"))
                    .child(Element::leaf("Type", "MSR"))
                    .child(Element::leaf("Size", "16")),
            );
            let mut windows = action_add(Element::new("CreatePartition"))
                .child(Element::leaf("Order", "3"))
                .child(Element::leaf("Type", "Primary"));
            if !with_recovery {
                // The Windows partition can only extend when nothing follows it.
                windows.push(Element::leaf("Extend", "true"));
            }
            create.push(windows);
            if with_recovery {
                create.push(
                    action_add(Element::new("CreatePartition"))
                        .child(Element::leaf("Order", "4"))
                        .child(Element::leaf("Type", "Primary"))
                        .child(Element::leaf("Size", recovery_size.to_string())),
                );
            }

            modify.push(
                action_add(Element::new("ModifyPartition"))
                    .child(Element::leaf("Order", "1"))
                    .child(Element::leaf("PartitionID", "1"))
                    .child(Element::leaf("Label", "System"))
                    .child(Element::leaf("Format", "FAT32")),
            );
            // MSR is never formatted.
            modify.push(
                action_add(Element::new("ModifyPartition"))
                    .child(Element::leaf("Order", "2"))
                    .child(Element::leaf("PartitionID", "3"))
                    .child(Element::leaf("Label", "Windows"))
                    .child(Element::leaf("Letter", "C"))
                    .child(Element::leaf("Format", "NTFS")),
            );
            if with_recovery {
                modify.push(
                    action_add(Element::new("ModifyPartition"))
                        .child(Element::leaf("Order", "3"))
                        .child(Element::leaf("PartitionID", "4"))
                        .child(Element::leaf("Label", "Recovery"))
                        .child(Element::leaf("Format", "NTFS"))
                        .child(Element::leaf("TypeID", RECOVERY_TYPE_ID)),
                );
            }
        }
        PartitionStyle::Mbr => {
            create.push(
                action_add(Element::new("CreatePartition"))
                    .child(Element::leaf("Order", "1"))
                    .child(Element::leaf("Type", "Primary"))
                    .child(Element::leaf("Extend", "true")),
            );
            modify.push(
                action_add(Element::new("ModifyPartition"))
                    .child(Element::leaf("Active", "true"))
                    .child(Element::leaf("Format", "NTFS"))
                    .child(Element::leaf("Label", "Windows"))
                    .child(Element::leaf("Letter", "C"))
                    .child(Element::leaf("Order", "1"))
                    .child(Element::leaf("PartitionID", "1")),
            );
        }
    }

    Element::new("DiskConfiguration").child(
        action_add(Element::new("Disk"))
            .child(Element::leaf("DiskID", "0"))
            .child(Element::leaf("WillWipeDisk", bool_text(config.wipe_disk)))
            .child(create)
            .child(modify),
    )
}

fn image_install(config: &UnattendConfig) -> Element {
    let partition_id = match config.partition_style {
        PartitionStyle::Gpt => "3",
        PartitionStyle::Mbr => "1",
    };

    let mut os_image = Element::new("OSImage").child(
        Element::new("InstallTo")
            .child(Element::leaf("DiskID", "0"))
            .child(Element::leaf("PartitionID", partition_id)),
    );
    if !config.windows_edition.is_empty() {
        os_image.push(
            Element::new("InstallFrom").child(
                action_add(Element::new("MetaData"))
                    .child(Element::leaf("Key", "/IMAGE/NAME"))
                    .child(Element::leaf("Value", &*config.windows_edition)),
            ),
        );
    }
    Element::new("ImageInstall").child(os_image)
}

fn user_data(config: &UnattendConfig) -> Element {
    let mut user_data = Element::new("UserData").child(Element::leaf("AcceptEula", "true"));

    let key = match config.product_key_mode {
        ProductKeyMode::Custom if !config.product_key.is_empty() => {
            Some(config.product_key.clone())
        }
        ProductKeyMode::Generic => Some(generic_key(&config.windows_edition).to_string()),
        _ => None,
    };
    if let Some(key) = key {
        user_data.push(
            Element::new("ProductKey")
                .child(Element::leaf("Key", key))
                .child(Element::leaf("WillShowUI", "OnError")),
        );
    }
    user_data
}

fn generic_key(edition: &str) -> &'static str {
    GENERIC_KEYS
        .iter()
        .find(|(name, _)| *name == edition)
        .or_else(|| GENERIC_KEYS.iter().find(|(name, _)| *name == "Professional"))
        .map(|(_, key)| *key)
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// specialize pass
// ---------------------------------------------------------------------------

fn specialize_components(config: &UnattendConfig, arch: Arch) -> Vec<Element> {
    let computer_name = match config.computer_name_mode {
        ComputerNameMode::Custom if !config.computer_name.is_empty() => {
            sanitize_computer_name(&config.computer_name)
        }
        _ => String::from("*"),
    };

    let mut components = vec![
        component("Microsoft-Windows-Shell-Setup", arch)
            .child(Element::leaf("ComputerName", computer_name))
            .child(Element::leaf(
                "TimeZone",
                or_default(&config.timezone, "Pacific Standard Time"),
            )),
    ];

    if config.disable_defender {
        components.push(
            component("Windows-Defender-ApplicationGuard", arch)
                .child(Element::leaf("DisableAntiSpyware", "true")),
        );
    }
    components
}

/// Windows computer names: letters, digits and hyphens only, at most 15
/// characters, uppercased.
pub fn sanitize_computer_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .take(15)
        .collect::<String>()
        .to_uppercase()
}

// ---------------------------------------------------------------------------
// oobeSystem pass
// ---------------------------------------------------------------------------

fn oobe_system_components(config: &UnattendConfig, arch: Arch) -> Vec<Element> {
    let mut shell = component("Microsoft-Windows-Shell-Setup", arch).attr("xmlns:wcm", WCM_XMLNS);

    shell.push(oobe_element(config));

    let accounts = config.populated_accounts();
    if !accounts.is_empty() {
        let mut local_accounts = Element::new("LocalAccounts");
        for account in &accounts {
            local_accounts.push(
                action_add(Element::new("LocalAccount"))
                    .child(Element::leaf("Name", &*account.username))
                    .child(Element::leaf(
                        "DisplayName",
                        or_default(&account.display_name, &account.username),
                    ))
                    .child(Element::leaf("Group", or_default(&account.group, "Users")))
                    .child(password_element("Password", &account.password, "Password")),
            );
        }

        let mut user_accounts = Element::new("UserAccounts").child(local_accounts);
        if config.enable_builtin_admin {
            user_accounts.push(password_element(
                "AdministratorPassword",
                &config.builtin_admin_password,
                "AdministratorPassword",
            ));
        }
        shell.push(user_accounts);

        // First account flagged for auto logon wins.
        if let Some(account) = accounts.iter().find(|account| account.autologon) {
            shell.push(
                Element::new("AutoLogon")
                    .child(Element::leaf("Enabled", "true"))
                    .child(Element::leaf("LogonCount", "999"))
                    .child(Element::leaf("Username", &*account.username))
                    .child(password_element("Password", &account.password, "Password")),
            );
        }
    }

    if let Some(first_logon) = first_logon_commands(config) {
        shell.push(first_logon);
    }

    vec![shell]
}

fn oobe_element(config: &UnattendConfig) -> Element {
    let mut oobe = Element::new("OOBE")
        .child(Element::leaf("HideEULAPage", "true"))
        .child(Element::leaf("HideOEMRegistrationScreen", "true"))
        .child(Element::leaf("HideOnlineAccountScreens", "true"))
        .child(Element::leaf("HideWirelessSetupInOOBE", "true"));

    match config.privacy_settings {
        PrivacySetting::Disable => oobe.push(Element::leaf("ProtectYourPC", "3")),
        PrivacySetting::Enable => oobe.push(Element::leaf("ProtectYourPC", "1")),
        PrivacySetting::Interactive => {}
    }
    if config.skip_machine_oobe {
        oobe.push(Element::leaf("SkipMachineOOBE", "true"));
    }
    if config.skip_user_oobe {
        oobe.push(Element::leaf("SkipUserOOBE", "true"));
    }
    oobe
}

/// A non-empty password is never stored in the clear: the context suffix is
/// appended and the result base64 encoded. An empty password stays plain.
fn password_element(name: &str, password: &str, suffix: &str) -> Element {
    let (value, plain_text) = if password.is_empty() {
        (String::new(), "true")
    } else {
        (BASE64.encode(format!("{password}{suffix}")), "false")
    };
    Element::new(name)
        .child(Element::leaf("Value", value))
        .child(Element::leaf("PlainText", plain_text))
}

/// One strictly increasing order counter shared across the whole
/// first-logon block, scoped to a single build.
struct CommandSequence {
    order: u32,
    commands: Vec<Element>,
}

impl CommandSequence {
    fn new() -> Self {
        Self {
            order: 1,
            commands: Vec::new(),
        }
    }

    fn push(&mut self, command_line: String, description: &str) {
        self.commands.push(
            action_add(Element::new("SynchronousCommand"))
                .child(Element::leaf("Order", self.order.to_string()))
                .child(Element::leaf("CommandLine", command_line))
                .child(Element::leaf("Description", description)),
        );
        self.order += 1;
    }
}

fn first_logon_commands(config: &UnattendConfig) -> Option<Element> {
    let mut sequence = CommandSequence::new();

    for command in tweaks::tweak_commands(config) {
        sequence.push(format!("cmd /c {command}"), "Registry Tweak");
    }

    if config.vm_virtual_box {
        sequence.push(
            String::from(r"E:\VBoxWindowsAdditions.exe /S"),
            "Install VirtualBox Guest Additions",
        );
    }
    if config.vm_vmware {
        sequence.push(
            String::from(r#"E:\setup.exe /S /v "/qn REBOOT=R""#),
            "Install VMware Tools",
        );
    }

    if config.first_logon_script_type != ScriptKind::None && !config.first_logon_script.is_empty() {
        let extension = config.first_logon_script_type.extension();
        let path = format!(r"{SCRIPT_DIR}\FirstLogon.{extension}");
        let encoded = BASE64.encode(&config.first_logon_script);
        sequence.push(
            format!(
                r#"powershell -Command "mkdir {SCRIPT_DIR} -Force; [System.Text.Encoding]::UTF8.GetString([System.Convert]::FromBase64String('{encoded}')) | Out-File '{path}'""#
            ),
            "Create First Logon Script",
        );
        sequence.push(
            config.first_logon_script_type.launcher(&path),
            "Execute First Logon Script",
        );
    }

    if sequence.commands.is_empty() {
        return None;
    }
    let mut first_logon = Element::new("FirstLogonCommands");
    first_logon.children = sequence.commands;
    Some(first_logon)
}

fn bool_text(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Account;
    use crate::xml::Element;

    fn built_tree(config: &UnattendConfig) -> Element {
        build(config).unwrap().parse().unwrap()
    }

    fn base_config() -> UnattendConfig {
        let mut config = UnattendConfig::default();
        config.explorer_show_extensions = false;
        config.explorer_this_pc_view = false;
        config
    }

    fn settings<'a>(tree: &'a Element, pass: &str) -> &'a Element {
        tree.children_named("settings")
            .find(|s| s.attr_value("pass") == Some(pass))
            .unwrap()
    }

    #[test]
    fn test_document_has_declaration_and_namespace() {
        let xml = build(&base_config()).unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
        assert!(xml.contains("<unattend xmlns=\"urn:schemas-microsoft-com:unattend\">"));
    }

    #[test]
    fn test_build_is_deterministic() {
        let config = base_config();
        assert_eq!(build(&config).unwrap(), build(&config).unwrap());
    }

    #[test]
    fn test_architecture_replication_is_adjacent_and_ordered() {
        let mut config = base_config();
        config.arch_x86 = true;
        config.arch_amd64 = true;

        let tree = built_tree(&config);
        let pe = settings(&tree, "windowsPE");
        let archs: Vec<(&str, &str)> = pe
            .children_named("component")
            .map(|c| {
                (
                    c.attr_value("name").unwrap(),
                    c.attr_value("processorArchitecture").unwrap(),
                )
            })
            .collect();

        assert_eq!(
            archs,
            vec![
                ("Microsoft-Windows-International-Core-WinPE", "x86"),
                ("Microsoft-Windows-International-Core-WinPE", "amd64"),
                ("Microsoft-Windows-Setup", "x86"),
                ("Microsoft-Windows-Setup", "amd64"),
            ]
        );
    }

    #[test]
    fn test_single_architecture_is_used_as_is() {
        let mut config = base_config();
        config.arch_amd64 = false;
        config.arch_arm64 = true;

        let tree = built_tree(&config);
        let pe = settings(&tree, "windowsPE");
        assert!(
            pe.children_named("component")
                .all(|c| c.attr_value("processorArchitecture") == Some("arm64"))
        );
    }

    #[test]
    fn test_gpt_with_recovery_partition_layout() {
        let config = base_config();
        let tree = built_tree(&config);
        let disk = tree.descendant("Disk").unwrap();

        let creates = disk.descendants("CreatePartition");
        assert_eq!(creates.len(), 4);
        assert_eq!(creates[0].child_text("Type"), Some("EFI"));
        assert_eq!(creates[0].child_text("Size"), Some("100"));
        assert_eq!(creates[1].child_text("Type"), Some("MSR"));
        assert_eq!(creates[2].child_text("Extend"), None);
        assert_eq!(creates[3].child_text("Size"), Some("990"));

        let modifies = disk.descendants("ModifyPartition");
        assert_eq!(modifies.len(), 3);
        assert_eq!(modifies[0].child_text("Format"), Some("FAT32"));
        assert_eq!(modifies[1].child_text("Letter"), Some("C"));
        assert_eq!(modifies[2].child_text("TypeID"), Some(RECOVERY_TYPE_ID));

        assert_eq!(disk.child_text("WillWipeDisk"), Some("true"));
    }

    #[test]
    fn test_gpt_without_recovery_extends_windows_partition() {
        let mut config = base_config();
        config.recovery_mode = RecoveryMode::None;

        let tree = built_tree(&config);
        let creates = tree.descendants("CreatePartition");
        assert_eq!(creates.len(), 3);
        assert_eq!(creates[2].child_text("Extend"), Some("true"));
        assert_eq!(tree.descendants("ModifyPartition").len(), 2);
    }

    #[test]
    fn test_mbr_layout_and_install_target() {
        let mut config = base_config();
        config.partition_style = PartitionStyle::Mbr;

        let tree = built_tree(&config);
        assert_eq!(tree.descendants("CreatePartition").len(), 1);
        let install_to = tree.descendant("InstallTo").unwrap();
        assert_eq!(install_to.child_text("PartitionID"), Some("1"));
    }

    #[test]
    fn test_gpt_install_target_is_third_partition() {
        let tree = built_tree(&base_config());
        let install_to = tree.descendant("InstallTo").unwrap();
        assert_eq!(install_to.child_text("PartitionID"), Some("3"));
    }

    #[test]
    fn test_custom_partition_mode_emits_disk_stub() {
        let mut config = base_config();
        config.partition_mode = PartitionMode::Custom;

        let tree = built_tree(&config);
        let disk = tree.descendant("Disk").unwrap();
        assert!(disk.descendants("CreatePartition").is_empty());
        assert!(tree.descendant("ImageInstall").is_none());
    }

    #[test]
    fn test_bypass_flags_emit_all_four_checks_in_order() {
        let mut config = base_config();
        config.bypass_tpm = true;

        let tree = built_tree(&config);
        let commands = tree.descendants("RunSynchronousCommand");
        assert_eq!(commands.len(), 4);
        for (index, check) in [
            "BypassTPMCheck",
            "BypassSecureBootCheck",
            "BypassRAMCheck",
            "BypassStorageCheck",
        ]
        .iter()
        .enumerate()
        {
            assert_eq!(commands[index].child_text("Order"), Some((index + 1).to_string().as_str()));
            assert!(commands[index].child_text("Path").unwrap().contains(check));
        }
    }

    #[test]
    fn test_no_bypass_flags_no_run_synchronous() {
        let tree = built_tree(&base_config());
        assert!(tree.descendant("RunSynchronous").is_none());
    }

    #[test]
    fn test_generic_product_keys() {
        let mut config = base_config();
        config.product_key_mode = ProductKeyMode::Generic;
        config.windows_edition = String::from("Home");
        let tree = built_tree(&config);
        assert_eq!(
            tree.descendant("ProductKey").unwrap().child_text("Key"),
            Some("TX9XD-98N7V-6WMQ6-BX7FG-H8Q99")
        );

        // Unrecognized editions fall back to the Professional key.
        config.windows_edition = String::from("Ultimate");
        let tree = built_tree(&config);
        assert_eq!(
            tree.descendant("ProductKey").unwrap().child_text("Key"),
            Some("VK7JG-NPHTM-C97JM-9MPGT-3V66T")
        );
    }

    #[test]
    fn test_key_mode_none_omits_product_key() {
        let tree = built_tree(&base_config());
        assert!(tree.descendant("ProductKey").is_none());
        assert_eq!(
            tree.descendant("UserData").unwrap().child_text("AcceptEula"),
            Some("true")
        );
    }

    #[test]
    fn test_computer_name_wildcard_and_sanitized_custom() {
        let tree = built_tree(&base_config());
        assert_eq!(tree.descendant("ComputerName").unwrap().text.as_deref(), Some("*"));

        let mut config = base_config();
        config.computer_name_mode = ComputerNameMode::Custom;
        config.computer_name = String::from("My PC!-name-overflowing");
        let tree = built_tree(&config);
        // Invalid characters dropped before the 15-character cut.
        assert_eq!(
            tree.descendant("ComputerName").unwrap().text.as_deref(),
            Some("MYPC-NAME-OVERF")
        );
    }

    #[test]
    fn test_defender_component_only_when_disabled() {
        let tree = built_tree(&base_config());
        assert!(tree.descendant("DisableAntiSpyware").is_none());

        let mut config = base_config();
        config.disable_defender = true;
        let tree = built_tree(&config);
        let specialize = settings(&tree, "specialize");
        let defender = specialize
            .children_named("component")
            .find(|c| c.attr_value("name") == Some("Windows-Defender-ApplicationGuard"))
            .unwrap();
        assert_eq!(defender.child_text("DisableAntiSpyware"), Some("true"));
    }

    #[test]
    fn test_password_is_encoded_with_context_suffix() {
        let mut config = base_config();
        let mut account = Account::new("alice");
        account.password = String::from("Pass1");
        config.accounts = vec![account];

        let xml = build(&config).unwrap();
        assert!(!xml.contains("Pass1</Value>"));
        // base64("Pass1Password")
        assert!(xml.contains("UGFzczFQYXNzd29yZA=="));

        let tree: Element = xml.parse().unwrap();
        let password = tree.descendant("LocalAccount").unwrap().child_named("Password").unwrap();
        assert_eq!(password.child_text("PlainText"), Some("false"));
    }

    #[test]
    fn test_empty_password_stays_plain() {
        let mut config = base_config();
        config.accounts = vec![Account::new("alice")];

        let tree = built_tree(&config);
        let password = tree.descendant("LocalAccount").unwrap().child_named("Password").unwrap();
        assert_eq!(password.child_text("PlainText"), Some("true"));
        assert_eq!(password.child_named("Value").unwrap().text, None);
    }

    #[test]
    fn test_administrator_password_uses_admin_suffix() {
        let mut config = base_config();
        config.accounts = vec![Account::new("alice")];
        config.enable_builtin_admin = true;
        config.builtin_admin_password = String::from("Pass1");

        let xml = build(&config).unwrap();
        // base64("Pass1AdministratorPassword")
        assert!(xml.contains(&BASE64.encode("Pass1AdministratorPassword")));
    }

    #[test]
    fn test_no_accounts_means_no_user_accounts_block() {
        let config = base_config();
        assert!(config.accounts[0].username.is_empty());

        let tree = built_tree(&config);
        assert!(tree.descendant("UserAccounts").is_none());
        assert!(tree.descendant("AutoLogon").is_none());
    }

    #[test]
    fn test_auto_logon_uses_first_flagged_account() {
        let mut config = base_config();
        let mut first = Account::new("first");
        first.password = String::from("pw");
        let mut second = Account::new("second");
        second.autologon = true;
        let mut third = Account::new("third");
        third.autologon = true;
        config.accounts = vec![first, second, third];

        let tree = built_tree(&config);
        let auto_logon = tree.descendant("AutoLogon").unwrap();
        assert_eq!(auto_logon.child_text("Username"), Some("second"));
        assert_eq!(auto_logon.child_text("LogonCount"), Some("999"));
        assert_eq!(auto_logon.child_text("Enabled"), Some("true"));
    }

    #[test]
    fn test_first_logon_command_numbering_spans_groups() {
        let mut config = base_config();
        config.disable_defender = true;
        config.disable_updates = true;
        config.vm_virtual_box = true;

        let tree = built_tree(&config);
        let commands = tree.descendants("SynchronousCommand");
        assert_eq!(commands.len(), 3);

        let summary: Vec<(&str, &str)> = commands
            .iter()
            .map(|c| (c.child_text("Order").unwrap(), c.child_text("CommandLine").unwrap()))
            .collect();
        assert_eq!(summary[0].0, "1");
        assert!(summary[0].1.contains("DisableAntiSpyware"));
        assert_eq!(summary[1].0, "2");
        assert!(summary[1].1.contains("NoAutoUpdate"));
        assert_eq!(summary[2].0, "3");
        assert!(summary[2].1.contains("VBoxWindowsAdditions.exe"));
    }

    #[test]
    fn test_first_logon_script_emits_write_then_execute() {
        let mut config = base_config();
        config.first_logon_script_type = ScriptKind::Ps1;
        config.first_logon_script = String::from("Write-Host 'hello'");

        let tree = built_tree(&config);
        let commands = tree.descendants("SynchronousCommand");
        assert_eq!(commands.len(), 2);

        let create = commands[0].child_text("CommandLine").unwrap();
        assert!(create.contains("FromBase64String"));
        assert!(create.contains(&BASE64.encode("Write-Host 'hello'")));
        assert!(create.contains(r"C:\Windows\Setup\Scripts\FirstLogon.ps1"));

        let execute = commands[1].child_text("CommandLine").unwrap();
        assert_eq!(
            execute,
            r#"powershell -ExecutionPolicy Bypass -File "C:\Windows\Setup\Scripts\FirstLogon.ps1""#
        );
    }

    #[test]
    fn test_privacy_setting_codes() {
        let mut config = base_config();
        config.privacy_settings = PrivacySetting::Disable;
        let tree = built_tree(&config);
        assert_eq!(tree.descendant("ProtectYourPC").unwrap().text.as_deref(), Some("3"));

        config.privacy_settings = PrivacySetting::Enable;
        let tree = built_tree(&config);
        assert_eq!(tree.descendant("ProtectYourPC").unwrap().text.as_deref(), Some("1"));

        config.privacy_settings = PrivacySetting::Interactive;
        let tree = built_tree(&config);
        assert!(tree.descendant("ProtectYourPC").is_none());
    }

    #[test]
    fn test_language_fallback_only_with_secondary_language() {
        let tree = built_tree(&base_config());
        assert!(tree.descendant("UILanguageFallback").is_none());

        let mut config = base_config();
        config.language_secondary = String::from("de-DE");
        let tree = built_tree(&config);
        assert_eq!(
            tree.descendant("UILanguageFallback").unwrap().text.as_deref(),
            Some("en-US")
        );
    }

    #[test]
    fn test_command_lines_are_escaped_in_output() {
        let mut config = base_config();
        config.vm_vmware = true;

        let xml = build(&config).unwrap();
        assert!(xml.contains(r#"E:\setup.exe /S /v &quot;/qn REBOOT=R&quot;"#));
    }
}
