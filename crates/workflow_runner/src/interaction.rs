/// Blocking questions and side effects that need a human.
///
/// Keeps planning and execution independent of a terminal; the CLI provides
/// the interactive implementation, tests a scripted one.
pub trait UserInteraction {
    /// Asks a yes/no question.
    fn confirm(&mut self, prompt: &str, default: bool) -> bool;

    /// Opens `url` in a browser. Returns false if that was not possible.
    fn open_url(&mut self, url: &str) -> bool;

    /// Waits until the user acknowledges `prompt`.
    fn acknowledge(&mut self, prompt: &str);
}

/// Answers every question with its default and never opens anything.
///
/// Used for non-interactive runs; an absent GitHub App therefore aborts,
/// since the installation confirmation defaults to "no".
#[derive(Debug, Default)]
pub struct NonInteractive;

impl UserInteraction for NonInteractive {
    fn confirm(&mut self, _prompt: &str, default: bool) -> bool {
        default
    }

    fn open_url(&mut self, _url: &str) -> bool {
        false
    }

    fn acknowledge(&mut self, _prompt: &str) {}
}
