pub mod billing;
pub mod block;
pub mod log;
pub mod recovery;
pub mod roster;
pub mod subscription;

pub use billing::{Billing, BillingStatus, BillingUpdate, NewBilling};
pub use block::{
  BlockPlan, BlockStatus, DayExercise, ExerciseSet, ExerciseSetUpdate, NewDayExercise,
  NewTrainingBlock, NewTrainingDay, PlannedDay, PlannedExercise, TrainingBlock, TrainingDay,
};
pub use log::{ExerciseLog, LoggedSet, NewExerciseLog};
pub use recovery::{NewRecoveryCheckin, RecoveryCheckin};
pub use roster::{Athlete, Coach, Exercise, NewExercise, NewPerson};
pub use subscription::{CoachSubscription, SubscriptionStatus};
