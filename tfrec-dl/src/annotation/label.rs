//! The class label table.

use crate::common::*;

/// Ordered class name to label index mapping. Unseen names are appended on
/// lookup, so the table grows in encounter order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelMap {
    names: IndexSet<String>,
}

impl LabelMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the table from a file with one class name per line.
    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to load labels file '{}'", path.display()))?;
        let lines: Vec<_> = content.lines().collect();
        let names: IndexSet<String> = lines.iter().map(|line| line.to_string()).collect();
        ensure!(
            lines.len() == names.len(),
            "duplicated label names found in '{}'",
            path.display()
        );
        ensure!(!names.is_empty(), "no labels found in '{}'", path.display());
        Ok(Self { names })
    }

    /// The label of a class name, assigning the next free label on first
    /// encounter.
    pub fn get_or_insert(&mut self, name: &str) -> i64 {
        let (index, _) = self.names.insert_full(name.to_owned());
        index as i64
    }

    pub fn get(&self, name: &str) -> Option<i64> {
        self.names.get_index_of(name).map(|index| index as i64)
    }

    pub fn name(&self, label: i64) -> Option<&str> {
        let index = usize::try_from(label).ok()?;
        self.names.get_index(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Write the table back to disk, one class name per line.
    pub fn save<P>(&self, path: P) -> Result<()>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let mut content: String = self.names.iter().join("\n");
        content.push('\n');
        fs::write(path, content)
            .with_context(|| format!("failed to save labels file '{}'", path.display()))?;
        Ok(())
    }
}
