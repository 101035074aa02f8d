// Mirrors the tables created by `init_schema` in lib.rs. Keep the two in sync by hand.

diesel::table! {
    admin_sessions (id) {
        id -> Integer,
        token -> Text,
        created_at -> Timestamp,
    }
}

diesel::table! {
    contests (id) {
        id -> Integer,
        class_level -> Integer,
        year -> Integer,
        pre_number -> Integer,
        contest_url -> Nullable<Text>,
        solution_url -> Nullable<Text>,
    }
}

diesel::allow_tables_to_appear_in_same_query!(admin_sessions, contests);
