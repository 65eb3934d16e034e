/// Displays bytes in string form if they make up a string, else just displays them as bytes.
pub fn display_magic_number(bytes: &[u8]) -> String {
	std::str::from_utf8(bytes).map(str::to_owned).unwrap_or(format!("{bytes:?}"))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn magic_number_display() {
		assert_eq!(display_magic_number(b"RBSP"), "RBSP");
		assert_eq!(display_magic_number(&[0xFF, 0, 1, 2]), "[255, 0, 1, 2]");
	}
}
