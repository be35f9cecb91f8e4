pub mod event;
pub mod feedback;
pub mod registration;
pub mod student;

pub use event::{Event, EventSummary};
pub use feedback::{FeedbackForm, FeedbackView, NewFeedback, RatingFilter};
pub use registration::{NewRegistration, RegistrationForm, RegistrationView};
pub use student::Student;
