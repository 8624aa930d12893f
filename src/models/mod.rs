pub mod invoice;
pub mod party;
pub mod record;
pub mod template;
pub mod user;

pub use invoice::{Invoice, NewInvoice};
pub use party::{is_valid_cnic, NewParty, Party, PartyKey, PartyKind};
pub use record::{format_money, round_money, InvoiceAmounts, InvoiceRecord, PartyRef};
pub use template::{ReportCounts, TemplateRow};
pub use user::{NewUser, Team, User, UserCredentials, ADMIN_ROLE};
