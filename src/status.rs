use std::{fmt, str::FromStr};

use diesel::{
    deserialize::{self, FromSql, FromSqlRow},
    expression::AsExpression,
    pg::{Pg, PgValue},
    serialize::{self, Output, ToSql},
    sql_types::Text,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("'{value}' is not a valid {kind}")]
pub struct ParseStatusError {
    pub kind: &'static str,
    pub value: String,
}

/// Declares a closed enumeration persisted as TEXT, with its wire strings.
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $name:ident ($kind:literal) { $($variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema,
            AsExpression, FromSqlRow,
        )]
        #[diesel(sql_type = Text)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseStatusError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    _ => Err(ParseStatusError {
                        kind: $kind,
                        value: s.to_string(),
                    }),
                }
            }
        }

        impl ToSql<Text, Pg> for $name {
            fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
                <str as ToSql<Text, Pg>>::to_sql(self.as_str(), out)
            }
        }

        impl FromSql<Text, Pg> for $name {
            fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
                let value = <String as FromSql<Text, Pg>>::from_sql(bytes)?;
                Ok(value.parse()?)
            }
        }
    };
}

text_enum! {
    /// Role carried by the session.
    Role ("role") {
        User => "USER",
        Admin => "ADMIN",
    }
}

text_enum! {
    OrderStatus ("order status") {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
        Completed => "completed",
        CancellationRequested => "cancellation_requested",
    }
}

text_enum! {
    AppointmentStatus ("appointment status") {
        Pending => "pending",
        Confirmed => "confirmed",
        Scheduled => "scheduled",
        Cancelled => "cancelled",
        Completed => "completed",
    }
}

text_enum! {
    PaymentStatus ("payment status") {
        Pending => "pending",
        Paid => "paid",
    }
}

text_enum! {
    PaymentType ("payment type") {
        Appointment => "appointment",
        Product => "product",
    }
}

impl OrderStatus {
    /// Statuses an administrator may set directly.
    pub const ADMIN_TARGETS: &'static [OrderStatus] = &[
        OrderStatus::Approved,
        OrderStatus::Rejected,
        OrderStatus::Completed,
    ];

    /// The single transition table for product orders. Every mutating
    /// operation on an order consults this before writing.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;

        matches!(
            (self, next),
            (Pending, Approved)
                | (Pending, Rejected)
                | (Pending, CancellationRequested)
                | (Approved, Completed)
                | (Approved, Rejected)
                | (Approved, CancellationRequested)
                | (CancellationRequested, Approved)
                | (CancellationRequested, Rejected)
        )
    }
}

impl AppointmentStatus {
    /// Statuses a booking may start in.
    pub const INITIAL: &'static [AppointmentStatus] = &[
        AppointmentStatus::Pending,
        AppointmentStatus::Confirmed,
        AppointmentStatus::Scheduled,
    ];

    /// The single transition table for appointments.
    pub fn can_transition_to(self, next: AppointmentStatus) -> bool {
        use AppointmentStatus::*;

        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Scheduled)
                | (Confirmed, Scheduled)
                | (Scheduled, Completed)
                | (Pending, Cancelled)
                | (Confirmed, Cancelled)
                | (Scheduled, Cancelled)
        )
    }

    /// Every status that may move to `next`, for guarded bulk updates.
    pub fn sources_of(next: AppointmentStatus) -> Vec<AppointmentStatus> {
        Self::ALL
            .iter()
            .copied()
            .filter(|status| status.can_transition_to(next))
            .collect()
    }
}
