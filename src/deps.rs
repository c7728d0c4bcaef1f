use std::process::{Command, Stdio};

/// One external binary the production collaborators shell out to.
#[derive(Clone, Copy, Debug)]
pub struct ExternalTool {
    pub binary: &'static str,
    pub probe_arg: &'static str,
    pub role: &'static str,
    pub install_hint: &'static str,
}

pub const REQUIRED_TOOLS: &[ExternalTool] = &[
    ExternalTool {
        binary: "ffmpeg",
        probe_arg: "-version",
        role: "video encoding",
        install_hint: "Debian/Ubuntu: sudo apt-get install ffmpeg | macOS: brew install ffmpeg",
    },
    ExternalTool {
        binary: "ffprobe",
        probe_arg: "-version",
        role: "audio duration measurement (ships with ffmpeg)",
        install_hint: "Debian/Ubuntu: sudo apt-get install ffmpeg | macOS: brew install ffmpeg",
    },
    ExternalTool {
        binary: "soffice",
        probe_arg: "--version",
        role: "slide rasterization (LibreOffice)",
        install_hint: "Debian/Ubuntu: sudo apt-get install libreoffice-impress | macOS: brew install --cask libreoffice",
    },
    ExternalTool {
        binary: "pdftoppm",
        probe_arg: "-v",
        role: "slide rasterization (poppler)",
        install_hint: "Debian/Ubuntu: sudo apt-get install poppler-utils | macOS: brew install poppler",
    },
    ExternalTool {
        binary: "espeak-ng",
        probe_arg: "--version",
        role: "speech synthesis",
        install_hint: "Debian/Ubuntu: sudo apt-get install espeak-ng | macOS: brew install espeak-ng",
    },
];

pub fn is_tool_on_path(binary: &str, probe_arg: &str) -> bool {
    Command::new(binary)
        .arg(probe_arg)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Probe every required tool; returns the missing ones.
pub fn missing_tools() -> Vec<&'static ExternalTool> {
    REQUIRED_TOOLS
        .iter()
        .filter(|t| !is_tool_on_path(t.binary, t.probe_arg))
        .collect()
}
