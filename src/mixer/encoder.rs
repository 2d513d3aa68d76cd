//! Command encoding for the vMix function API
//!
//! Commands are plain GET requests: `/api/?Function=Name&Key=Value...`.

use std::fmt;

/// Path of the XML snapshot endpoint
pub const API_PATH: &str = "/api/";

/// Build the request path for a vMix function call.
///
/// Parameters are appended in the order given. Values are inserted verbatim: the
/// protocol only carries input numbers and integers here.
pub fn encode(function: &str, params: &[(&str, &str)]) -> String {
    let mut path = format!("{}?Function={}", API_PATH, function);
    for (key, value) in params {
        path.push('&');
        path.push_str(key);
        path.push('=');
        path.push_str(value);
    }
    path
}

/// The vMix functions issued by the dispatcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    PreviewInput { input: String },
    Fade { input: String },
    Cut { input: String },
    FadeToBlack,
    OverlayIn { layer: u8, input: String },
    OverlayOut { layer: u8 },
}

impl Command {
    /// vMix function name
    pub fn function(&self) -> String {
        match self {
            Command::PreviewInput { .. } => "PreviewInput".to_string(),
            Command::Fade { .. } => "Fade".to_string(),
            Command::Cut { .. } => "Cut".to_string(),
            Command::FadeToBlack => "FadeToBlack".to_string(),
            Command::OverlayIn { layer, .. } => format!("OverlayInput{}", layer),
            Command::OverlayOut { layer } => format!("OverlayInput{}Out", layer),
        }
    }

    fn input(&self) -> Option<&str> {
        match self {
            Command::PreviewInput { input }
            | Command::Fade { input }
            | Command::Cut { input }
            | Command::OverlayIn { input, .. } => Some(input),
            Command::FadeToBlack | Command::OverlayOut { .. } => None,
        }
    }

    /// Request path for this command
    pub fn to_path(&self) -> String {
        let function = self.function();
        match self.input() {
            Some(input) => encode(&function, &[("Input", input)]),
            None => encode(&function, &[]),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.input() {
            Some(input) => write!(f, "{}(Input={})", self.function(), input),
            None => write!(f, "{}", self.function()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_keeps_param_order() {
        assert_eq!(
            encode("SetText", &[("Input", "2"), ("Value", "10"), ("SelectedIndex", "0")]),
            "/api/?Function=SetText&Input=2&Value=10&SelectedIndex=0"
        );
        assert_eq!(encode("FadeToBlack", &[]), "/api/?Function=FadeToBlack");
    }

    #[test]
    fn test_command_paths() {
        let cases = [
            (Command::PreviewInput { input: "3".into() }, "/api/?Function=PreviewInput&Input=3"),
            (Command::Fade { input: "12".into() }, "/api/?Function=Fade&Input=12"),
            (Command::Cut { input: "12".into() }, "/api/?Function=Cut&Input=12"),
            (Command::FadeToBlack, "/api/?Function=FadeToBlack"),
            (
                Command::OverlayIn { layer: 2, input: "5".into() },
                "/api/?Function=OverlayInput2&Input=5",
            ),
            (Command::OverlayOut { layer: 4 }, "/api/?Function=OverlayInput4Out"),
        ];

        for (command, expected) in cases {
            assert_eq!(command.to_path(), expected, "{}", command);
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(Command::Cut { input: "3".into() }.to_string(), "Cut(Input=3)");
        assert_eq!(Command::OverlayOut { layer: 1 }.to_string(), "OverlayInput1Out");
    }
}
