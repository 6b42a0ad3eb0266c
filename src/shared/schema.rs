diesel::table! {
    organizations (id) {
        id -> Uuid,
        name -> Text,
        created_by -> Uuid,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    users (id) {
        id -> Uuid,
        username -> Text,
        email -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    user_organizations (id) {
        id -> Uuid,
        user_id -> Uuid,
        organization_id -> Uuid,
        role -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    leads (id) {
        id -> Uuid,
        organization_id -> Uuid,
        user_id -> Uuid,
        name -> Text,
        email -> Text,
        title -> Nullable<Text>,
        company -> Nullable<Text>,
        status -> Text,
        stage -> Nullable<Text>,
        tags -> Array<Uuid>,
        notes -> Text,
        persona_summary -> Nullable<Text>,
        lead_score -> Nullable<Int4>,
        outreach_tone -> Nullable<Text>,
        outreach_message -> Nullable<Text>,
        sent -> Bool,
        synced_at -> Nullable<Timestamptz>,
        enriched_at -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    tag_presets (id) {
        id -> Uuid,
        organization_id -> Uuid,
        label -> Text,
        color -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    messages (id) {
        id -> Uuid,
        organization_id -> Uuid,
        user_id -> Uuid,
        username -> Text,
        #[sql_name = "type"]
        type_ -> Text,
        content -> Text,
        read_by -> Array<Uuid>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    activity_logs (id) {
        id -> Uuid,
        user_id -> Nullable<Uuid>,
        organization_id -> Nullable<Uuid>,
        #[sql_name = "type"]
        type_ -> Text,
        message -> Text,
        metadata -> Jsonb,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    user_preferences (user_id) {
        user_id -> Uuid,
        goal -> Nullable<Text>,
        company_type -> Nullable<Text>,
        role -> Nullable<Text>,
        theme -> Nullable<Text>,
        display_mode -> Nullable<Text>,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    user_integrations (id) {
        id -> Uuid,
        user_id -> Uuid,
        provider -> Text,
        status -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    daily_summaries (organization_id) {
        organization_id -> Uuid,
        summary -> Text,
        generated_at -> Timestamptz,
    }
}

diesel::joinable!(user_organizations -> users (user_id));
diesel::joinable!(user_organizations -> organizations (organization_id));

diesel::allow_tables_to_appear_in_same_query!(user_organizations, users, organizations);
