use clap::ValueEnum;

/// Controls whether output is colorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum Color {
    /// Never colorize.
    No,
    /// Always colorize.
    Yes,
    /// Colorize when stdout is a terminal that supports it.
    Auto,
}

impl Color {
    /// Resolve the choice against the current stdout.
    pub fn is_enabled(self) -> bool {
        match self {
            Color::No => false,
            Color::Yes => true,
            Color::Auto => supports_color::on(supports_color::Stream::Stdout).is_some(),
        }
    }
}

/// Install the `color-eyre` report handler, with a blank theme when color is disabled.
pub fn install_color_eyre(color: Color) -> color_eyre::Result<(), color_eyre::Report> {
    if color.is_enabled() {
        color_eyre::install()
    } else {
        // Use an empty theme to disable error coloring
        color_eyre::config::HookBuilder::new()
            .theme(color_eyre::config::Theme::new())
            .install()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_choices_ignore_terminal() {
        assert!(Color::Yes.is_enabled());
        assert!(!Color::No.is_enabled());
    }
}
