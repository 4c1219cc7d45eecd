//! TON: cells, bags of cells, addresses and wallet transfers

pub mod address;
pub mod boc;
pub mod cell;
pub mod message;
pub mod wallet;

pub use address::{AddressFlags, TonAddress};
pub use cell::{Cell, CellBuilder, CellSlice};
pub use message::{MessageBody, TonMessage};
pub use wallet::{TonTransfer, WalletVersion};
