//! Pairing URL scanned by the app to join a relay server.

/// Prefix the app recognises in a scanned code.
pub const PAIRING_URL_PREFIX: &str = "https://www.dungeon-lab.com/app-download.php#DGLAB-SOCKET#";

/// Builds the URL the app scans to reach `ws://{host}:{port}/{client_id}`.
pub fn pairing_url(host: &str, port: u16, client_id: &str) -> String {
	format!("{PAIRING_URL_PREFIX}ws://{host}:{port}/{client_id}")
}

/// Extracts the websocket address from a pairing URL.
pub fn pairing_ws_address(url: &str) -> Option<&str> {
	url.strip_prefix(PAIRING_URL_PREFIX)
		.filter(|rest| rest.starts_with("ws://") || rest.starts_with("wss://"))
}
