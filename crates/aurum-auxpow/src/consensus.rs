mod params;

pub use encode::{Decodable, Encodable, Error as EncodeDecodeError, MAX_VEC_SIZE, VarInt};
pub use params::Params;

/// Consensus encoding and decoding functionality.
pub mod encode {
    pub use bitcoin::consensus::encode::{Decodable, Encodable, Error, MAX_VEC_SIZE, VarInt};
}

/// Implements the consensus `Encodable`/`Decodable` pair for a struct by
/// encoding its fields in declaration order.
macro_rules! impl_consensus_encoding {
    ($thing:ident, $($field:ident),+) => {
        impl $crate::consensus::Encodable for $thing {
            #[inline]
            fn consensus_encode<W: bitcoin::io::Write + ?Sized>(
                &self,
                writer: &mut W,
            ) -> Result<usize, bitcoin::io::Error> {
                let mut len = 0;
                $(len += self.$field.consensus_encode(writer)?;)+
                Ok(len)
            }
        }

        impl $crate::consensus::Decodable for $thing {
            #[inline]
            fn consensus_decode_from_finite_reader<R: bitcoin::io::Read + ?Sized>(
                reader: &mut R,
            ) -> Result<$thing, $crate::consensus::EncodeDecodeError> {
                Ok($thing {
                    $($field: $crate::consensus::Decodable::consensus_decode_from_finite_reader(reader)?,)+
                })
            }

            #[inline]
            fn consensus_decode<R: bitcoin::io::Read + ?Sized>(
                reader: &mut R,
            ) -> Result<$thing, $crate::consensus::EncodeDecodeError> {
                let mut reader = reader.take($crate::consensus::MAX_VEC_SIZE as u64);
                Ok($thing {
                    $($field: $crate::consensus::Decodable::consensus_decode(&mut reader)?,)+
                })
            }
        }
    };
}

pub(crate) use impl_consensus_encoding;
