// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health,

        // --- INVENTORY ---
        handlers::inventory::register_entry,
        handlers::inventory::register_exit,
        handlers::inventory::register_adjustment,
        handlers::inventory::get_stock,
        handlers::inventory::get_lot_movements,

        // --- CONSULTATIONS ---
        handlers::consultations::complete_consultation,
        handlers::consultations::register_prescription,
        handlers::consultations::get_consultation_prescription,

        // --- PRESCRIPTIONS ---
        handlers::prescriptions::complete_prescription,
        handlers::prescriptions::cancel_prescription,

        // --- VACCINATIONS ---
        handlers::vaccinations::apply_vaccination,
    ),
    components(
        schemas(
            // --- Inventory ---
            models::inventory::Medication,
            models::inventory::Lot,
            models::inventory::MovementKind,
            models::inventory::Movement,
            models::inventory::StockAvailability,
            models::inventory::EntryOutcome,

            // --- Clinical ---
            models::clinical::ConsultationStatus,
            models::clinical::ConsultationKind,
            models::clinical::Consultation,
            models::clinical::HistoryEntry,
            models::clinical::HistoryWriteKind,
            models::clinical::WeightLog,
            models::clinical::CompletedConsultation,
            models::clinical::PrescriptionStatus,
            models::clinical::Prescription,
            models::clinical::PrescriptionLine,
            models::clinical::PrescriptionDetail,
            models::clinical::PrescriptionCompletion,
            models::clinical::VaccinationRecord,
            models::clinical::VaccinationOutcome,

            // --- Auth ---
            models::auth::Role,

            // --- Payloads ---
            handlers::inventory::RegisterEntryPayload,
            handlers::inventory::RegisterExitPayload,
            handlers::inventory::AdjustmentMode,
            handlers::inventory::RegisterAdjustmentPayload,
            handlers::consultations::CompleteConsultationPayload,
            handlers::consultations::PrescriptionLinePayload,
            handlers::consultations::RegisterPrescriptionPayload,
            handlers::vaccinations::ApplyVaccinationPayload,
        )
    ),
    tags(
        (name = "Health", description = "Status do Servidor"),
        (name = "Inventory", description = "Estoque de Medicamentos por Lote"),
        (name = "Consultations", description = "Conclusão de Consultas e Receitas"),
        (name = "Prescriptions", description = "Dispensação de Receitas"),
        (name = "Vaccinations", description = "Aplicação de Vacinas")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
