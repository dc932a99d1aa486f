pub(crate) mod attempt_lifecycle;
pub(crate) mod invoice_docx;
pub(crate) mod marking;
pub(crate) mod quiz_status;
pub(crate) mod quiz_timing;
pub(crate) mod slot_assembly;
