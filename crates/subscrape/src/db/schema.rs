// SPDX-License-Identifier: GPL-3.0

// Diesel schema for the SQLite tables of the scrape cache.
diesel::table! {
	blocks (block_number) {
		block_number -> BigInt,
	}
}

diesel::table! {
	extrinsics (id) {
		id -> Text,
		block_number -> BigInt,
		module -> Text,
		call -> Text,
		address -> Nullable<Text>,
		nonce -> Nullable<BigInt>,
		extrinsic_hash -> Text,
		success -> Bool,
		params -> Nullable<Text>,
		fee -> Nullable<BigInt>,
		fee_used -> Nullable<BigInt>,
		error -> Nullable<Text>,
		finalized -> Bool,
		tip -> Nullable<BigInt>,
	}
}

diesel::table! {
	events (id) {
		id -> Text,
		block_number -> BigInt,
		extrinsic_id -> Nullable<Text>,
		module -> Text,
		event -> Text,
		params -> Nullable<Text>,
		finalized -> Bool,
	}
}

diesel::joinable!(extrinsics -> blocks (block_number));
diesel::joinable!(events -> blocks (block_number));

diesel::allow_tables_to_appear_in_same_query!(blocks, extrinsics, events);
