pub mod manufacturer;
pub mod medicine;

pub use manufacturer::ManufacturerService;
pub use medicine::MedicineService;
