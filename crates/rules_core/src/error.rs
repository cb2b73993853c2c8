//! Configuration-time error taxonomy.
//!
//! These are the only errors that escape into the caller: bad gateway
//! writes and aborted ramps are logged in place and never surface here
//! (see SPEC_FULL.md §7).

#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("bad duration value: '{0}'")]
    BadDuration(String),

    #[error("bad bus address: '{0}'")]
    BadBusAddress(String),

    #[error("unsupported condition type: '{0}'")]
    UnsupportedConditionType(String),

    #[error("unsupported action type: '{0}'")]
    UnsupportedActionType(String),

    #[error("wrong object type for action: '{0}'")]
    ObjectTypeMismatch(String),

    #[error("incompatible object types for copy-value: from='{from}' to='{to}'")]
    CopyTypeMismatch { from: String, to: String },

    #[error("timer can't define both <{a}> and <{b}>")]
    ConflictingTimerSchedule { a: String, b: String },

    #[error("timer must define <at> or <every>")]
    MissingTimerSchedule,

    #[error("parameter <every> must be greater than <during>")]
    EveryNotGreaterThanDuring,

    #[error("rule not found: '{0}'")]
    UnknownRuleId(String),

    #[error("object not found: '{0}'")]
    UnknownObjectId(String),

    #[error("missing required attribute '{0}' on <{1}>")]
    MissingAttribute(String, String),

    #[error("missing required child element '{0}' on <{1}>")]
    MissingChild(String, String),

    #[error("invalid value for attribute '{attr}': '{value}'")]
    InvalidAttributeValue { attr: String, value: String },
}
