//! Anonymous response labels for peer ranking

/// Maps rankable members to `Response A`, `Response B`, … in panel order.
///
/// Raters only ever see labels, never member ids or model names.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResponseLabels(Vec<(char, String)>);

impl ResponseLabels {
    pub fn assign<I, S>(member_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(
            ('A'..='Z')
                .zip(member_ids)
                .map(|(letter, id)| (letter, id.into()))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn letter_of(&self, member_id: &str) -> Option<char> {
        self.0
            .iter()
            .find(|(_, id)| id == member_id)
            .map(|(letter, _)| *letter)
    }

    pub fn member_for(&self, letter: char) -> Option<&str> {
        let letter = letter.to_ascii_uppercase();
        self.0
            .iter()
            .find(|(l, _)| *l == letter)
            .map(|(_, id)| id.as_str())
    }

    /// Every labelled member except `rater`, in label order
    pub fn peers_of<'a>(&'a self, rater: &'a str) -> impl Iterator<Item = (char, &'a str)> + 'a {
        self.0
            .iter()
            .filter(move |(_, id)| id != rater)
            .map(|(letter, id)| (*letter, id.as_str()))
    }

    pub fn member_ids(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(_, id)| id.as_str())
    }
}

/// Display label for a response letter
pub fn response_label(letter: char) -> String {
    format!("Response {}", letter)
}
