//! Diesel table definitions for the accounts schema.
//!
//! These definitions must match `migrations/` exactly.

diesel::table! {
    /// Registered accounts keyed by user name.
    users (user_name) {
        user_name -> Varchar,
        /// Argon2id PHC string.
        password_hash -> Text,
        /// Canonical role names; never empty.
        roles -> Array<Text>,
        /// Digest of the outstanding one-time password, if any.
        one_time_password_hash -> Nullable<Text>,
        created_at -> Timestamptz,
        /// Maintained by the `users_touch_updated_at` trigger.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Invitation codes with one flag per granted role.
    invitation_codes (code) {
        code -> Varchar,
        is_used -> Bool,
        admin -> Bool,
        student -> Bool,
        instructor -> Bool,
        staff -> Bool,
        reviewer -> Bool,
        generated_at -> Timestamptz,
    }
}
