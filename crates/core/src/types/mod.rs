//! Core types for Shelfwise.
//!
//! This module provides type-safe wrappers for common domain concepts.

/// Implements `sqlx` TEXT encode/decode for a `String` newtype.
///
/// Values read back from the database are trusted: they were validated on
/// the way in.
macro_rules! impl_pg_text {
    ($name:ident) => {
        #[cfg(feature = "postgres")]
        impl ::sqlx::Type<::sqlx::Postgres> for $name {
            fn type_info() -> ::sqlx::postgres::PgTypeInfo {
                <String as ::sqlx::Type<::sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &::sqlx::postgres::PgTypeInfo) -> bool {
                <String as ::sqlx::Type<::sqlx::Postgres>>::compatible(ty)
            }
        }

        #[cfg(feature = "postgres")]
        impl<'r> ::sqlx::Decode<'r, ::sqlx::Postgres> for $name {
            fn decode(
                value: ::sqlx::postgres::PgValueRef<'r>,
            ) -> ::core::result::Result<Self, ::sqlx::error::BoxDynError> {
                let s = <String as ::sqlx::Decode<::sqlx::Postgres>>::decode(value)?;
                Ok(Self(s))
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Encode<'_, ::sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut ::sqlx::postgres::PgArgumentBuffer,
            ) -> ::std::result::Result<::sqlx::encode::IsNull, ::sqlx::error::BoxDynError> {
                <String as ::sqlx::Encode<::sqlx::Postgres>>::encode_by_ref(&self.0, buf)
            }
        }
    };
}

pub mod cert;
pub mod email;
pub mod id;
pub mod keyword;
pub mod shop;
pub mod status;

pub use cert::{CertNumber, CertNumberError};
pub use email::{Email, EmailError};
pub use id::*;
pub use keyword::{Keyword, KeywordError};
pub use shop::{ShopDomain, ShopDomainError};
pub use status::*;
