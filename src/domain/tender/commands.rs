use uuid::Uuid;

// ============================================================================
// Tender Commands - Represent user intent
// ============================================================================
//
// Enum-valued fields arrive as raw strings and are parsed by the handler
// before any store call.
//
// ============================================================================

#[derive(Debug, Clone)]
pub enum TenderCommand {
    CreateTender {
        name: String,
        description: String,
        service_type: String,
        organization_id: Uuid,
        creator_username: String,
    },
    SetTenderStatus {
        tender_id: Uuid,
        username: String,
        status: String,
    },
    PatchTender {
        tender_id: Uuid,
        username: String,
        name: Option<String>,
        description: Option<String>,
        service_type: Option<String>,
        status: Option<String>,
    },
    RollbackTender {
        tender_id: Uuid,
        version: i64,
        username: String,
    },
}
