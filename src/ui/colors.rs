//! Terminal color theming, mirroring the teacher's `ui::colors` module:
//! a small enum of named themes plus a `--color` on/off/auto switch, both
//! resolved once at startup and threaded into the command handlers.

use clap::ValueEnum;
use crossterm::style::Color;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
  Auto,
  Always,
  Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum Theme {
  #[default]
  Default,
  Mono,
  HighContrast,
}

#[derive(Debug, Clone, Copy)]
pub struct Colors {
  pub enabled: bool,
  pub theme: Theme,
}

impl Colors {
  pub fn resolve(mode: ColorMode, theme: Theme) -> Colors {
    let enabled = match mode {
      ColorMode::Always => true,
      ColorMode::Never => false,
      ColorMode::Auto => std::io::IsTerminal::is_terminal(&std::io::stdout()),
    };
    Colors { enabled, theme }
  }

  pub fn info(&self) -> Color {
    if !self.enabled {
      return Color::Reset;
    }
    match self.theme {
      Theme::Default => Color::Cyan,
      Theme::Mono => Color::White,
      Theme::HighContrast => Color::Blue,
    }
  }

  pub fn success(&self) -> Color {
    if !self.enabled {
      return Color::Reset;
    }
    match self.theme {
      Theme::Default => Color::Green,
      Theme::Mono => Color::White,
      Theme::HighContrast => Color::Green,
    }
  }

  pub fn warning(&self) -> Color {
    if !self.enabled {
      return Color::Reset;
    }
    match self.theme {
      Theme::Default => Color::Yellow,
      Theme::Mono => Color::White,
      Theme::HighContrast => Color::Yellow,
    }
  }

  pub fn error(&self) -> Color {
    if !self.enabled {
      return Color::Reset;
    }
    match self.theme {
      Theme::Default => Color::Red,
      Theme::Mono => Color::White,
      Theme::HighContrast => Color::Red,
    }
  }
}
