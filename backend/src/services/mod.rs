//! Business logic services for the F&B Supply Chain Platform

pub mod audit;
pub mod catalog;
pub mod internal_request;
pub mod inventory;
pub mod purchase_order;
pub mod receiving;
pub mod sequence;
pub mod transfer;

pub use audit::AuditService;
pub use catalog::CatalogService;
pub use internal_request::InternalRequestService;
pub use inventory::InventoryService;
pub use purchase_order::PurchaseOrderService;
pub use receiving::ReceivingService;
pub use transfer::TransferService;
