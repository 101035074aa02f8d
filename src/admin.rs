use crate::client::TokenStore;
use crate::model::{Contest, ContestUpdate, NewContest};

/// Whether the admin panel may show the CRUD table. Decided purely by whether a token is
/// stored; there is no expiry check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionGate {
    #[default]
    Anonymous,
    Authenticated,
}

impl SessionGate {
    pub fn from_token(token: Option<&str>) -> Self {
        match token {
            Some(token) if !token.is_empty() => SessionGate::Authenticated,
            _ => SessionGate::Anonymous,
        }
    }

    pub fn from_store<S: TokenStore>(store: &S) -> Self {
        Self::from_token(store.token().as_deref())
    }

    pub fn is_authenticated(self) -> bool {
        self == SessionGate::Authenticated
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit(i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanelState {
    #[default]
    Browsing,
    FormOpen(FormMode),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error("Please fill in all required fields")]
    MissingRequired,
    #[error("{0} must be a whole number")]
    NotANumber(&'static str),
}

/// Raw form inputs, kept as typed so a half-filled form survives a failed save.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContestForm {
    pub class_level: String,
    pub year: String,
    pub pre_number: String,
    pub contest_url: String,
    pub solution_url: String,
}

impl ContestForm {
    pub fn from_contest(contest: &Contest) -> Self {
        ContestForm {
            class_level: contest.class_level.to_string(),
            year: contest.year.to_string(),
            pre_number: contest.pre_number.to_string(),
            contest_url: contest.contest_url.clone().unwrap_or_default(),
            solution_url: contest.solution_url.clone().unwrap_or_default(),
        }
    }

    /// Checks that the required fields are present and converts the numeric ones. Range checks
    /// are left to the server.
    pub fn to_new_contest(&self) -> Result<NewContest, FormError> {
        let class_level = self.class_level.trim();
        let year = self.year.trim();
        let pre_number = self.pre_number.trim();
        if class_level.is_empty() || year.is_empty() || pre_number.is_empty() {
            return Err(FormError::MissingRequired);
        }

        let number = |value: &str, field: &'static str| {
            value.parse::<i32>().map_err(|_| FormError::NotANumber(field))
        };
        Ok(NewContest {
            class_level: number(class_level, "Class level")?,
            year: number(year, "Year")?,
            pre_number: number(pre_number, "Pre number")?,
            contest_url: Some(self.contest_url.clone()),
            solution_url: Some(self.solution_url.clone()),
        }
        .normalized())
    }
}

/// What a valid form submission should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Create(NewContest),
    Update(i32, ContestUpdate),
}

/// State of the CRUD panel: browsing the table, or editing in the form. Errors are shown
/// without changing which of the two is active.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminPanel {
    pub state: PanelState,
    pub form: ContestForm,
    pub error: String,
    pub saving: bool,
}

impl AdminPanel {
    pub fn open_create(&mut self) {
        self.form = ContestForm::default();
        self.error.clear();
        self.state = PanelState::FormOpen(FormMode::Create);
    }

    pub fn open_edit(&mut self, contest: &Contest) {
        self.form = ContestForm::from_contest(contest);
        self.error.clear();
        self.state = PanelState::FormOpen(FormMode::Edit(contest.id));
    }

    /// Cancel, or close after a successful save.
    pub fn close(&mut self) {
        self.form = ContestForm::default();
        self.error.clear();
        self.saving = false;
        self.state = PanelState::Browsing;
    }

    pub fn is_form_open(&self) -> bool {
        matches!(self.state, PanelState::FormOpen(_))
    }

    pub fn editing_id(&self) -> Option<i32> {
        match self.state {
            PanelState::FormOpen(FormMode::Edit(id)) => Some(id),
            _ => None,
        }
    }

    /// Validates the form. On failure the error is recorded and nothing should be sent.
    pub fn submit(&mut self) -> Option<Submission> {
        let mode = match self.state {
            PanelState::FormOpen(mode) => mode,
            PanelState::Browsing => return None,
        };
        self.error.clear();
        match self.form.to_new_contest() {
            Ok(contest) => {
                self.saving = true;
                Some(match mode {
                    FormMode::Create => Submission::Create(contest),
                    FormMode::Edit(id) => Submission::Update(id, contest.into()),
                })
            }
            Err(e) => {
                self.error = e.to_string();
                None
            }
        }
    }

    /// A successful re-fetch drops errors left by earlier fetches or deletes. A save error stays
    /// while its form is still open.
    pub fn refreshed(&mut self) {
        if !self.is_form_open() {
            self.error.clear();
        }
    }

    /// Records a failed fetch, save or delete. The form, if open, keeps its contents.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.saving = false;
        self.error = message.into();
    }
}
