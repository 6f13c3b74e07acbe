//! Request schemas for every route.

use shared::ai::MAX_MESSAGE_CHARS;
use shared::{Field, RouteSchema, Schema};

fn credentials() -> Schema {
    Schema::new(vec![
        Field::email("email"),
        Field::text("password").length(8, 72),
    ])
}

fn patient_fields() -> Vec<Field> {
    vec![
        Field::text("name").length(1, 120),
        Field::email("email"),
        Field::text("phone").length(7, 30),
        Field::date("dob"),
        Field::text("medicalNotes").max_length(5000).optional().nullable(),
    ]
}

fn patient_id() -> Schema {
    Schema::new(vec![Field::uuid("id")])
}

pub fn register() -> RouteSchema {
    RouteSchema::new().body(credentials())
}

pub fn login() -> RouteSchema {
    RouteSchema::new().body(credentials())
}

pub fn list_patients() -> RouteSchema {
    RouteSchema::new().query(Schema::new(vec![
        Field::integer("page").min(1).default_value(1),
        Field::integer("limit").range(1, 100).default_value(10),
    ]))
}

pub fn create_patient() -> RouteSchema {
    RouteSchema::new().body(Schema::new(patient_fields()))
}

pub fn patient_by_id() -> RouteSchema {
    RouteSchema::new().params(patient_id())
}

pub fn update_patient() -> RouteSchema {
    RouteSchema::new()
        .body(
            Schema::new(patient_fields())
                .partial()
                .require_any("At least one field is required"),
        )
        .params(patient_id())
}

pub fn list_messages() -> RouteSchema {
    RouteSchema::new()
        .query(Schema::new(vec![
            Field::integer("limit").range(1, 200).default_value(50),
        ]))
        .params(patient_id())
}

pub fn send_chat() -> RouteSchema {
    RouteSchema::new().body(Schema::new(vec![
        Field::uuid("patientId"),
        Field::text("message").length(1, MAX_MESSAGE_CHARS),
    ]))
}

pub fn health() -> RouteSchema {
    RouteSchema::new()
}
