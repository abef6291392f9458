// Copyright (c) 2025 renewrs contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 告警分发器
pub mod dispatcher;

/// 提供方信封与应答判定
pub mod providers;
