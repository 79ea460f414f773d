pub mod document_sequence;
pub mod job_order;
pub mod profile;
pub mod quotation;
pub mod quotation_item;
pub mod sampling_assignment;
pub mod travel_order;

pub use document_sequence::Entity as DocumentSequence;
pub use job_order::{Entity as JobOrder, JobOrderStatus};
pub use profile::{Entity as Profile, ProfileRole};
pub use quotation::{Entity as Quotation, QuotationStatus};
pub use quotation_item::Entity as QuotationItem;
pub use sampling_assignment::{Entity as SamplingAssignment, PhotoRef, SamplingStatus};
pub use travel_order::Entity as TravelOrder;
