//! System tweak command generation.
//!
//! Each tweak is an independent rule producing one or more shell commands.
//! Rule order is fixed: the first-logon block numbers its commands
//! sequentially, so reordering rules changes the emitted documents.

use crate::config::{ThemeMode, ToggleState, UnattendConfig};

/// The ordered tweak command list.
pub fn tweak_commands(config: &UnattendConfig) -> Vec<String> {
    let mut commands: Vec<String> = Vec::new();
    let mut reg = |command: &str| commands.push(command.to_string());

    if config.disable_defender {
        reg(r#"reg add "HKLM\SOFTWARE\Policies\Microsoft\Windows Defender" /v DisableAntiSpyware /t REG_DWORD /d 1 /f"#);
    }
    if config.disable_updates {
        reg(r#"reg add "HKLM\SOFTWARE\Policies\Microsoft\Windows\WindowsUpdate\AU" /v NoAutoUpdate /t REG_DWORD /d 1 /f"#);
    }
    if config.disable_uac {
        reg(r#"reg add "HKLM\SOFTWARE\Microsoft\Windows\CurrentVersion\Policies\System" /v EnableLUA /t REG_DWORD /d 0 /f"#);
    }
    if config.disable_smart_screen {
        reg(r#"reg add "HKLM\SOFTWARE\Microsoft\Windows\CurrentVersion\Explorer" /v SmartScreenEnabled /t REG_SZ /d "Off" /f"#);
    }
    if config.disable_telemetry {
        reg(r#"reg add "HKLM\SOFTWARE\Policies\Microsoft\Windows\DataCollection" /v AllowTelemetry /t REG_DWORD /d 0 /f"#);
    }
    if config.enable_long_paths {
        reg(r#"reg add "HKLM\SYSTEM\CurrentControlSet\Control\FileSystem" /v LongPathsEnabled /t REG_DWORD /d 1 /f"#);
    }
    if config.enable_remote_desktop {
        reg(r#"reg add "HKLM\SYSTEM\CurrentControlSet\Control\Terminal Server" /v fDenyTSConnections /t REG_DWORD /d 0 /f"#);
        reg(r#"netsh advfirewall firewall set rule group="remote desktop" new enable=Yes"#);
    }
    if config.explorer_show_hidden {
        reg(r#"reg add "HKCU\SOFTWARE\Microsoft\Windows\CurrentVersion\Explorer\Advanced" /v Hidden /t REG_DWORD /d 1 /f"#);
    }
    if config.explorer_show_extensions {
        reg(r#"reg add "HKCU\SOFTWARE\Microsoft\Windows\CurrentVersion\Explorer\Advanced" /v HideFileExt /t REG_DWORD /d 0 /f"#);
    }
    if config.explorer_classic_context_menu {
        reg(r#"reg add "HKCU\Software\Classes\CLSID\{86ca1aa0-34aa-4e8b-a509-50c905bae2a2}\InprocServer32" /f /ve"#);
    }
    if config.explorer_this_pc_view {
        reg(r#"reg add "HKCU\SOFTWARE\Microsoft\Windows\CurrentVersion\Explorer\Advanced" /v LaunchTo /t REG_DWORD /d 1 /f"#);
    }
    if config.disable_mouse_acceleration {
        reg(r#"reg add "HKCU\Control Panel\Mouse" /v MouseSpeed /t REG_SZ /d "0" /f"#);
        reg(r#"reg add "HKCU\Control Panel\Mouse" /v MouseThreshold1 /t REG_SZ /d "0" /f"#);
        reg(r#"reg add "HKCU\Control Panel\Mouse" /v MouseThreshold2 /t REG_SZ /d "0" /f"#);
    }
    if config.taskbar_align_left {
        reg(r#"reg add "HKCU\Software\Microsoft\Windows\CurrentVersion\Explorer\Advanced" /v TaskbarAl /t REG_DWORD /d 0 /f"#);
    }
    if config.taskbar_disable_bing_search {
        reg(r#"reg add "HKCU\SOFTWARE\Microsoft\Windows\CurrentVersion\Search" /v BingSearchEnabled /t REG_DWORD /d 0 /f"#);
    }
    if config.set_power_shell_execution_policy {
        reg(r#"powershell -Command "Set-ExecutionPolicy RemoteSigned -Force""#);
    }
    if config.disable_edge_first_run {
        reg(r#"reg add "HKLM\SOFTWARE\Policies\Microsoft\Edge" /v HideFirstRunExperience /t REG_DWORD /d 1 /f"#);
    }
    match config.theme_mode {
        ThemeMode::Dark => {
            reg(r#"reg add "HKCU\SOFTWARE\Microsoft\Windows\CurrentVersion\Themes\Personalize" /v AppsUseLightTheme /t REG_DWORD /d 0 /f"#);
            reg(r#"reg add "HKCU\SOFTWARE\Microsoft\Windows\CurrentVersion\Themes\Personalize" /v SystemUsesLightTheme /t REG_DWORD /d 0 /f"#);
        }
        ThemeMode::Light => {
            reg(r#"reg add "HKCU\SOFTWARE\Microsoft\Windows\CurrentVersion\Themes\Personalize" /v AppsUseLightTheme /t REG_DWORD /d 1 /f"#);
            reg(r#"reg add "HKCU\SOFTWARE\Microsoft\Windows\CurrentVersion\Themes\Personalize" /v SystemUsesLightTheme /t REG_DWORD /d 1 /f"#);
        }
        ThemeMode::Default => {}
    }
    match config.num_lock_state {
        ToggleState::On => {
            reg(r#"reg add "HKU\.DEFAULT\Control Panel\Keyboard" /v InitialKeyboardIndicators /t REG_SZ /d "2" /f"#);
        }
        ToggleState::Off => {
            reg(r#"reg add "HKU\.DEFAULT\Control Panel\Keyboard" /v InitialKeyboardIndicators /t REG_SZ /d "0" /f"#);
        }
        ToggleState::Default => {}
    }

    commands
}

/// The same ordered command set as a batch script.
pub fn batch_script(config: &UnattendConfig) -> String {
    let commands = tweak_commands(config);
    if commands.is_empty() {
        return String::new();
    }

    format!(
        "@echo off\n:: Windows Registry Tweaks\n:: Generated by autounattend\n\n{}\n\necho Registry tweaks applied successfully.\n",
        commands.join("\n")
    )
}

/// The same ordered command set as a PowerShell script. Registry writes are
/// wrapped in process launches so the script works from any host.
pub fn powershell_script(config: &UnattendConfig) -> String {
    let commands = tweak_commands(config);
    if commands.is_empty() {
        return String::new();
    }

    let body: Vec<String> = commands
        .iter()
        .map(|command| {
            if let Some(args) = command.strip_prefix("reg ") {
                format!("Start-Process -FilePath \"reg.exe\" -ArgumentList '{args}' -NoNewWindow -Wait")
            } else if let Some(inline) = command.strip_prefix("powershell ") {
                inline.to_string()
            } else {
                format!("Start-Process -FilePath \"cmd.exe\" -ArgumentList '/c {command}' -NoNewWindow -Wait")
            }
        })
        .collect();

    format!(
        "# Windows Registry Tweaks\n# Generated by autounattend\n\n{}\n\nWrite-Host \"Registry tweaks applied successfully.\"\n",
        body.join("\n")
    )
}
