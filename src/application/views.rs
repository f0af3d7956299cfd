//! Named orderings, groupings and predicates offered to listings.

use std::{fmt, str::FromStr};

use time::OffsetDateTime;

use crate::domain::{
    entities::{DocumentRecord, ProjectRecord, Tagged},
    error::DomainError,
};

fn year(at: OffsetDateTime) -> String {
    format!("{:04}", at.year())
}

macro_rules! named_view {
    ($name:ident, $kind:literal { $($variant:ident => $key:literal, $label:literal;)+ }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $($variant,)+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];

            pub fn key(self) -> &'static str {
                match self {
                    $($name::$variant => $key,)+
                }
            }

            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }

        impl FromStr for $name {
            type Err = DomainError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($key => Ok($name::$variant),)+
                    other => Err(DomainError::unknown_view($kind, other, &[$($key,)+])),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.key())
            }
        }
    };
}

named_view!(ProjectSort, "project sort" {
    ByName => "byName", "Name";
    ByCreated => "byCreated", "Newest";
    ByLastPush => "byLastPush", "Recently updated";
});

named_view!(ProjectGroup, "project grouping" {
    ByCreated => "byCreated", "Year created";
    ByLastPush => "byLastPush", "Year of last push";
});

named_view!(DocumentSort, "document sort" {
    ByCreated => "byCreated", "Newest";
});

named_view!(DocumentGroup, "document grouping" {
    ByCreated => "byCreated", "Year";
});

fn last_push(project: &ProjectRecord) -> OffsetDateTime {
    project.pushed_at.unwrap_or(project.created_at)
}

impl ProjectSort {
    /// Strict less-than for this ordering.
    pub fn less(self) -> fn(&ProjectRecord, &ProjectRecord) -> bool {
        match self {
            ProjectSort::ByName => |a, b| a.name < b.name,
            ProjectSort::ByCreated => |a, b| a.created_at > b.created_at,
            ProjectSort::ByLastPush => |a, b| last_push(a) > last_push(b),
        }
    }
}

impl ProjectGroup {
    /// Group name of a project; a four digit year.
    pub fn key_fn(self) -> fn(&ProjectRecord) -> String {
        match self {
            ProjectGroup::ByCreated => |project| year(project.created_at),
            ProjectGroup::ByLastPush => |project| year(last_push(project)),
        }
    }
}

impl DocumentSort {
    pub fn less(self) -> fn(&DocumentRecord, &DocumentRecord) -> bool {
        match self {
            DocumentSort::ByCreated => |a, b| a.created_at > b.created_at,
        }
    }
}

impl DocumentGroup {
    pub fn key_fn(self) -> fn(&DocumentRecord) -> String {
        match self {
            DocumentGroup::ByCreated => |document| year(document.created_at),
        }
    }
}

pub fn visible(project: &ProjectRecord) -> bool {
    !project.hidden
}

pub fn tagged<T: Tagged + 'static>(
    value: &str,
) -> impl Fn(&T) -> bool + Send + Sync + use<T> {
    let value = value.to_string();
    move |record| record.has_tag(&value)
}
