use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Variant {
    Default,
    Destructive,
}

/// Short status message shown to the user after an action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub variant: Variant,
}

impl Notification {
    pub fn success(title: &str, description: impl Into<String>) -> Notification {
        Notification {
            title: title.to_string(),
            description: description.into(),
            variant: Variant::Default,
        }
    }

    pub fn error(description: impl Into<String>) -> Notification {
        Notification {
            title: "Error".to_string(),
            description: description.into(),
            variant: Variant::Destructive,
        }
    }

    /// Destructive notifications go to stderr, the rest to stdout.
    pub fn show(&self) {
        match self.variant {
            Variant::Default => println!("{}", self),
            Variant::Destructive => eprintln!("{}", self),
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.description)
    }
}
