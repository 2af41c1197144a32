use std::fmt;

/// Fixed catalog of issue types
///
/// Identifiers are stable: they are stored with every issue row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IssueType {
    Redirect3xx,
    Error4xx,
    Error5xx,
    EmptyTitle,
    ShortTitle,
    LongTitle,
    EmptyDescription,
    ShortDescription,
    LongDescription,
    MissingH1,
    MissingLang,
    LittleContent,
    DuplicatedTitle,
    DuplicatedDescription,
    DuplicatedContent,
}

impl IssueType {
    pub const ALL: [IssueType; 15] = [
        Self::Redirect3xx,
        Self::Error4xx,
        Self::Error5xx,
        Self::EmptyTitle,
        Self::ShortTitle,
        Self::LongTitle,
        Self::EmptyDescription,
        Self::ShortDescription,
        Self::LongDescription,
        Self::MissingH1,
        Self::MissingLang,
        Self::LittleContent,
        Self::DuplicatedTitle,
        Self::DuplicatedDescription,
        Self::DuplicatedContent,
    ];

    pub fn id(&self) -> i64 {
        match self {
            Self::Redirect3xx => 1,
            Self::Error4xx => 2,
            Self::Error5xx => 3,
            Self::EmptyTitle => 4,
            Self::ShortTitle => 5,
            Self::LongTitle => 6,
            Self::EmptyDescription => 7,
            Self::ShortDescription => 8,
            Self::LongDescription => 9,
            Self::MissingH1 => 10,
            Self::MissingLang => 11,
            Self::LittleContent => 12,
            Self::DuplicatedTitle => 13,
            Self::DuplicatedDescription => 14,
            Self::DuplicatedContent => 15,
        }
    }

    pub fn from_id(id: i64) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.id() == id)
    }

    /// Stable code name, e.g. `ERROR_SHORT_TITLE`
    pub fn code(&self) -> &'static str {
        match self {
            Self::Redirect3xx => "ERROR_30x",
            Self::Error4xx => "ERROR_40x",
            Self::Error5xx => "ERROR_50x",
            Self::EmptyTitle => "ERROR_EMPTY_TITLE",
            Self::ShortTitle => "ERROR_SHORT_TITLE",
            Self::LongTitle => "ERROR_LONG_TITLE",
            Self::EmptyDescription => "ERROR_EMPTY_DESCRIPTION",
            Self::ShortDescription => "ERROR_SHORT_DESCRIPTION",
            Self::LongDescription => "ERROR_LONG_DESCRIPTION",
            Self::MissingH1 => "ERROR_NO_H1",
            Self::MissingLang => "ERROR_NO_LANG",
            Self::LittleContent => "ERROR_LITTLE_CONTENT",
            Self::DuplicatedTitle => "ERROR_DUPLICATED_TITLE",
            Self::DuplicatedDescription => "ERROR_DUPLICATED_DESCRIPTION",
            Self::DuplicatedContent => "ERROR_DUPLICATED_CONTENT",
        }
    }
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
