// Copyright (c) 2025 renewrs contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 错误类型模块
pub mod errors;

/// 遥测模块
pub mod telemetry;

/// 校验模块
pub mod validators;
