// Netzwerk: UDP-Sockets und Protokoll-Transporte

pub mod socket;
pub mod transport;

pub use socket::{SocketBuffers, UdpPort};
pub use transport::{DmxTransport, LlrpSocket, RemoteSocket};
