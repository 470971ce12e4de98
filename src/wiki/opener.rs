/// Opens a URL or file in a new browsing context.
pub trait Opener {
    fn open(&mut self, target: &str) -> anyhow::Result<()>;
}

/// Records targets instead of launching anything; hosts without a browser
/// (the terminal front end, tests) read them back from [`LogOpener::opened`].
#[derive(Debug, Default)]
pub struct LogOpener {
    opened: Vec<String>,
}

impl LogOpener {
    pub fn new() -> Self {
        LogOpener::default()
    }

    pub fn opened(&self) -> &[String] {
        &self.opened
    }
}

impl Opener for LogOpener {
    fn open(&mut self, target: &str) -> anyhow::Result<()> {
        log::info!("open {}", target);
        self.opened.push(target.to_string());
        Ok(())
    }
}
