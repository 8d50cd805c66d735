use clap::ValueEnum;
use crossterm::style::Color;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Theme {
    Classic,
    Night,
    Neon,
    Default,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Palette {
    pub background: Color,
    pub snake: Color,
    pub food: Color,
    pub text: Color,
}

impl Theme {
    pub const ALL: [Theme; 4] = [Theme::Classic, Theme::Night, Theme::Neon, Theme::Default];

    pub fn name(self) -> &'static str {
        match self {
            Theme::Classic => "classic",
            Theme::Night => "night",
            Theme::Neon => "neon",
            Theme::Default => "default",
        }
    }

    pub fn palette(self) -> Palette {
        match self {
            Theme::Classic => Palette {
                background: Color::Rgb { r: 173, g: 216, b: 230 },
                snake: Color::Rgb { r: 0, g: 128, b: 0 },
                food: Color::Rgb { r: 255, g: 0, b: 0 },
                text: Color::Black,
            },
            Theme::Night => Palette {
                background: Color::Black,
                snake: Color::White,
                food: Color::Yellow,
                text: Color::White,
            },
            Theme::Neon => Palette {
                background: Color::Rgb { r: 128, g: 0, b: 128 },
                snake: Color::Rgb { r: 0, g: 255, b: 0 },
                food: Color::Cyan,
                text: Color::White,
            },
            Theme::Default => Palette {
                background: Color::Black,
                snake: Color::Green,
                food: Color::Red,
                text: Color::Grey,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_theme_keeps_snake_and_food_apart() {
        for theme in Theme::ALL {
            let p = theme.palette();
            assert_ne!(p.snake, p.food, "{}", theme.name());
            assert_ne!(p.snake, p.background, "{}", theme.name());
            assert_ne!(p.food, p.background, "{}", theme.name());
        }
    }
}
