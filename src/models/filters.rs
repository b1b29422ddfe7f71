use uuid::Uuid;

use super::enums::{PaymentStatus, TaskPriority, TaskStatus};

#[derive(Debug, Default)]
pub struct PatientFilter {
    pub last_name: Option<String>,
    pub payment_status: Option<PaymentStatus>,
}

#[derive(Debug, Default)]
pub struct TaskFilter {
    pub patient_id: Option<Uuid>,
    pub assignee: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
}
