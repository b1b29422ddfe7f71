pub mod enums;
pub mod filters;
pub mod milestone;
pub mod office;
pub mod patient;
pub mod staff;
pub mod task;
pub mod task_note;
pub mod user;

pub use milestone::Milestone;
pub use office::Office;
pub use patient::Patient;
pub use staff::Staff;
pub use task::{NewTask, Task};
pub use task_note::{TaskNote, MAX_NOTE_IMAGES};
pub use user::AuthenticatedUser;
