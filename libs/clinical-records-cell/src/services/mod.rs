// libs/clinical-records-cell/src/services/mod.rs
pub mod allergy;
pub mod clinical_note;
pub mod medical_exam;
pub mod medication;
pub mod record;
pub mod vital_signs;

pub use allergy::AllergyService;
pub use clinical_note::ClinicalNoteService;
pub use medical_exam::MedicalExamService;
pub use medication::MedicationService;
pub use record::RecordService;
pub use vital_signs::VitalSignsService;
