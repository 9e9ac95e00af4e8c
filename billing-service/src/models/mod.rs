//! Domain models for billing-service.

mod bill_item;
mod invoice;
mod line_item;
mod payment;

pub use bill_item::{BillItem, BillItemKind};
pub use invoice::{CreateInvoice, Invoice, InvoiceStatus, ListInvoicesFilter, UpdateInvoice};
pub use line_item::{CreateLineItem, LineItem};
pub use payment::{CreatePayment, ListPaymentsFilter, Payment, PaymentMethod};
