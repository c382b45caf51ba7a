pub mod codec;
pub mod definition;
pub mod domain;
pub mod flow;
pub mod grading;
pub mod ports;
pub mod summary;

pub use definition::{
    DefinitionError, Page, Question, QuestionKind, ResultDisplay, ResultsKind, ResultsPolicy,
    SurveyDefinition, ValueType,
};
pub use domain::{
    AnswerRow, CodeSnippet, InvitationMail, IssuedSession, PagePosition, PendingCohort,
    ResponseRecord, SessionHandle, SurveyInfo,
};
pub use ports::{
    DefinitionSource, MailDelivery, PortError, PortResult, SessionResolver, SnippetStore,
    SurveyStore,
};
