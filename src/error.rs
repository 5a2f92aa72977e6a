use thiserror::Error;

/// Broad classification used to map an [`Error`] to a response policy:
/// validation errors are caller-correctable, contention errors are
/// retryable after a reload, integrity errors indicate a broken reference,
/// infrastructure errors carry the underlying cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Validation,
    Contention,
    Integrity,
    Infrastructure,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid id")]
    InvalidId,
    #[error("duplicated element")]
    DuplicatedElement { constraint: String },
    #[error("element not found")]
    ElementNotFound,
    #[error("invalid name")]
    InvalidName,
    #[error("invalid mail")]
    InvalidMail,
    #[error("duplicated mail")]
    DuplicatedMail,
    #[error("invalid update data")]
    InvalidUpdateData,

    #[error("invalid level for action")]
    InvalidLevelForAction,
    #[error("level incorrect")]
    LevelIncorrect,
    #[error("invalid amount for action")]
    InvalidAmountForAction,
    #[error("invalid planet for action")]
    InvalidPlanetForAction,
    #[error("invalid player for action")]
    InvalidPlayerForAction,
    #[error("invalid element for action")]
    InvalidElementForAction,
    #[error("mismatch in verification")]
    MismatchInVerification,
    #[error("invalid duration")]
    InvalidDuration,
    #[error("no fields left")]
    NoFieldsLeft,
    #[error("only one action authorized")]
    OnlyOneActionAuthorized,
    #[error("building cannot be built")]
    BuildingCannotBeBuilt,

    #[error("non existing planet")]
    NonExistingPlanet,
    #[error("non existing moon")]
    NonExistingMoon,
    #[error("non existing player")]
    NonExistingPlayer,
    #[error("non existing element")]
    NonExistingElement,
    #[error("non existing account")]
    NonExistingAccount,
    #[error("non existing universe")]
    NonExistingUniverse,

    #[error("invalid fleet component")]
    InvalidFleetComponent,
    #[error("duplicated fleet component")]
    DuplicatedFleetComponent,
    #[error("insufficient cargo")]
    InsufficientCargo,
    #[error("invalid cargo")]
    InvalidCargo,
    #[error("cargo not movable")]
    CargoNotMovable,
    #[error("arrival time mismatch")]
    ArrivalTimeMismatch,
    #[error("invalid propulsion system")]
    InvalidPropulsionSystem,
    #[error("invalid objective")]
    InvalidObjective,
    #[error("invalid fleet for component")]
    InvalidFleetForComponent,

    #[error("name already in use")]
    NameAlreadyInUse,
    #[error("multiple account in universe")]
    MultipleAccountInUniverse,
    #[error("inconsistent planet found")]
    InconsistentPlanetFound,
    #[error("cannot delete moon")]
    CannotDeleteMoon,
    #[error("homeworld cannot be deleted")]
    HomeworldCannotBeDeleted,
    #[error("action still in progress")]
    ActionStillInProgress,
    #[error("fleet not yet returned")]
    FleetNotYetReturned,
    #[error("fleet not yet arrived")]
    FleetNotYetArrived,
    #[error("fleet fight simulation failure")]
    FleetFightSimulationFailure,
    #[error("fleet espionage simulation failure")]
    FleetEspionageSimulationFailure,

    #[error("foreign key violation on {foreign_key}")]
    ForeignKeyViolation { foreign_key: String },
    #[error("database error: {0}")]
    Db(diesel::result::Error),
    #[error("connection pool error: {0}")]
    Pool(String),
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

impl Error {
    pub fn class(&self) -> ErrorClass {
        use Error::*;
        match self {
            DuplicatedElement { .. } | OnlyOneActionAuthorized | NameAlreadyInUse
            | DuplicatedMail | MultipleAccountInUniverse | DuplicatedFleetComponent => {
                ErrorClass::Contention
            }
            ForeignKeyViolation { .. }
            | NonExistingPlanet
            | NonExistingMoon
            | NonExistingPlayer
            | NonExistingElement
            | NonExistingAccount
            | NonExistingUniverse
            | InconsistentPlanetFound => ErrorClass::Integrity,
            Db(_) | Pool(_) | DeadlineExceeded | FleetFightSimulationFailure
            | FleetEspionageSimulationFailure => ErrorClass::Infrastructure,
            _ => ErrorClass::Validation,
        }
    }

    /// Classify a diesel error at the adapter boundary. Unique and foreign
    /// key violations get their own variants so callers can react to
    /// contention and broken references without string matching.
    pub fn from_db(err: diesel::result::Error) -> Error {
        use diesel::result::DatabaseErrorKind;
        use diesel::result::Error as DieselError;
        match err {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                Error::DuplicatedElement {
                    constraint: info.constraint_name().unwrap_or("unknown").to_string(),
                }
            }
            DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, info) => {
                Error::ForeignKeyViolation {
                    foreign_key: info.constraint_name().unwrap_or("unknown").to_string(),
                }
            }
            DieselError::NotFound => Error::ElementNotFound,
            other => Error::Db(other),
        }
    }

    /// Refine a classified adapter error using the table it was raised for.
    /// A foreign key violation on e.g. the fleets table means the referenced
    /// body or player is gone, which callers know as a non-existing-* error.
    pub fn refine_foreign_key(self) -> Error {
        match &self {
            Error::ForeignKeyViolation { foreign_key } => {
                let fk = foreign_key.as_str();
                if fk.contains("planet") || fk.contains("body") {
                    Error::NonExistingPlanet
                } else if fk.contains("moon") {
                    Error::NonExistingMoon
                } else if fk.contains("player") {
                    Error::NonExistingPlayer
                } else if fk.contains("account") {
                    Error::NonExistingAccount
                } else if fk.contains("universe") {
                    Error::NonExistingUniverse
                } else {
                    self
                }
            }
            _ => self,
        }
    }
}

impl From<diesel::result::Error> for Error {
    fn from(err: diesel::result::Error) -> Self {
        Error::from_db(err)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_error_classes() {
        assert_eq!(Error::InvalidMail.class(), ErrorClass::Validation);
        assert_eq!(
            Error::DuplicatedElement {
                constraint: "players_name_key".to_string()
            }
            .class(),
            ErrorClass::Contention
        );
        assert_eq!(Error::NonExistingPlanet.class(), ErrorClass::Integrity);
        assert_eq!(Error::DeadlineExceeded.class(), ErrorClass::Infrastructure);
    }

    #[test]
    fn test_refine_foreign_key() {
        let err = Error::ForeignKeyViolation {
            foreign_key: "fleets_player_id_fkey".to_string(),
        };
        assert!(matches!(err.refine_foreign_key(), Error::NonExistingPlayer));
        let err = Error::ForeignKeyViolation {
            foreign_key: "actions_body_id_fkey".to_string(),
        };
        assert!(matches!(err.refine_foreign_key(), Error::NonExistingPlanet));
    }
}
