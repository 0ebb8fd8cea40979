//! Project operator.

use crate::data::Page;
use crate::error::Result;
use crate::executor::Operator;

/// Keeps the listed channels, in the listed order.
pub struct ProjectOperator {
    child: Box<dyn Operator>,
    channels: Vec<usize>,
}

impl ProjectOperator {
    /// Creates a new project operator with the given child and channels.
    #[must_use]
    pub fn new(child: Box<dyn Operator>, channels: Vec<usize>) -> Self {
        ProjectOperator { child, channels }
    }

    /// Returns the projected channels.
    #[must_use]
    pub fn channels(&self) -> &[usize] {
        &self.channels
    }
}

impl Operator for ProjectOperator {
    fn next_page(&mut self) -> Result<Option<Page>> {
        match self.child.next_page()? {
            Some(page) => page.project(&self.channels).map(Some),
            None => Ok(None),
        }
    }

    fn name(&self) -> &'static str {
        "ProjectOperator"
    }
}
