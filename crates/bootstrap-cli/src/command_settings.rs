// Command-line arguments for `z80-bootstrap`.

use clap::Parser;

/// Install the SDCC Z80 toolchain and the retro-engine framework.
///
/// Steps whose result is already present are skipped, so the command can be
/// run again at any time.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "z80-bootstrap", version, about)]
pub struct CommandSettings {
    /// Rebuild build steps and re-fetch sources, keeping the previous copy
    /// as `<name>_old`.
    #[arg(long)]
    pub refresh: bool,
}

impl CommandSettings {
    pub fn parse_from_env() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_defaults_to_off() {
        let settings = CommandSettings::try_parse_from(["z80-bootstrap"]).unwrap();
        assert!(!settings.refresh);
    }

    #[test]
    fn refresh_flag() {
        let settings = CommandSettings::try_parse_from(["z80-bootstrap", "--refresh"]).unwrap();
        assert!(settings.refresh);
    }

    #[test]
    fn rejects_unknown_arguments() {
        assert!(CommandSettings::try_parse_from(["z80-bootstrap", "--force"]).is_err());
        assert!(CommandSettings::try_parse_from(["z80-bootstrap", "install"]).is_err());
    }
}
